use actix_web::http::header::HeaderMap;
use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use sha3::Digest;

/// 客户登录后拿到的 bearer token
///
/// 数据库里只保存它的 SHA3-256 摘要
#[derive(Debug)]
pub struct CustomerToken(SecretString);

impl CustomerToken {
    pub fn new(token: String) -> Self {
        Self(SecretString::from(token))
    }

    pub fn hash(&self) -> String {
        format!(
            "{:x}",
            sha3::Sha3_256::digest(self.0.expose_secret().as_bytes())
        )
    }
}

/// 没有 `Authorization` 头时返回 `Ok(None)`,按访客处理
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<CustomerToken>, anyhow::Error> {
    let Some(header_value) = headers.get("Authorization") else {
        return Ok(None);
    };
    let header_value = header_value
        .to_str()
        .context("The 'Authorization' header was not a valid UTF8 string.")?;
    let token = header_value
        .strip_prefix("Bearer ")
        .context("The authorization scheme was not 'Bearer'.")?
        .trim();
    if token.is_empty() {
        anyhow::bail!("A token must be provided in 'Bearer' auth.");
    }
    Ok(Some(CustomerToken::new(token.to_string())))
}
