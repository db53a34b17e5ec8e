use rand::{Rng, distributions::Alphanumeric, thread_rng};

const CODE_LENGTH: usize = 32;

/// 确认订阅用的随机码,随确认邮件中的链接一起发出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    pub fn generate() -> Self {
        let mut rng = thread_rng();
        let code = std::iter::repeat_with(|| rng.sample(Alphanumeric))
            .map(char::from)
            .take(CODE_LENGTH)
            .collect();
        Self(code)
    }

    /// 校验来自查询参数的确认码
    pub fn parse(s: String) -> Result<Self, String> {
        let is_valid_length = s.chars().count() == CODE_LENGTH;
        let is_alphanumeric = s.chars().all(|c| c.is_ascii_alphanumeric());
        if is_valid_length && is_alphanumeric {
            Ok(Self(s))
        } else {
            Err(format!("{} is not a valid confirmation code.", s))
        }
    }
}

impl AsRef<str> for ConfirmationCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
