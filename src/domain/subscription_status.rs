/// 订阅者的状态
///
/// 数据库里保存 `as_str` 的值,GraphQL 返回 `as_schema_enum` 的值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Subscribed,
    NotActive,
    Unsubscribed,
    Unconfirmed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Subscribed => "subscribed",
            SubscriptionStatus::NotActive => "not_active",
            SubscriptionStatus::Unsubscribed => "unsubscribed",
            SubscriptionStatus::Unconfirmed => "unconfirmed",
        }
    }

    /// 平台内部的状态编号
    pub fn code(&self) -> i16 {
        match self {
            SubscriptionStatus::Subscribed => 1,
            SubscriptionStatus::NotActive => 2,
            SubscriptionStatus::Unsubscribed => 3,
            SubscriptionStatus::Unconfirmed => 4,
        }
    }

    /// `SubscriptionStatusesEnum` 中对应的值
    pub fn as_schema_enum(&self) -> &'static str {
        match self {
            SubscriptionStatus::Subscribed => "SUBSCRIBED",
            SubscriptionStatus::NotActive => "NOT_ACTIVE",
            SubscriptionStatus::Unsubscribed => "UNSUBSCRIBED",
            SubscriptionStatus::Unconfirmed => "UNCONFIRMED",
        }
    }

    /// 新订阅的目标状态只取决于店铺是否要求确认
    pub fn for_new_subscription(confirmation_required: bool) -> Self {
        if confirmation_required {
            SubscriptionStatus::NotActive
        } else {
            SubscriptionStatus::Subscribed
        }
    }
}

/// 序列化为 GraphQL 枚举值
impl serde::Serialize for SubscriptionStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_schema_enum())
    }
}

impl TryFrom<String> for SubscriptionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "subscribed" => Ok(Self::Subscribed),
            "not_active" => Ok(Self::NotActive),
            "unsubscribed" => Ok(Self::Unsubscribed),
            "unconfirmed" => Ok(Self::Unconfirmed),
            other => Err(format!("{} is not a valid subscription status.", other)),
        }
    }
}
