use crate::{ConfigError, ConfigResult};

/// 配置校验接口
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// 通用校验工具
pub struct ValidationUtils;

impl ValidationUtils {
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{field_name} 不能为空")));
        }
        Ok(())
    }

    pub fn validate_timeout_seconds(timeout_seconds: u64, field_name: &str) -> ConfigResult<()> {
        if timeout_seconds == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} 必须大于 0"
            )));
        }
        if timeout_seconds > 3600 {
            return Err(ConfigError::Validation(format!(
                "{field_name} 不能超过 3600 秒"
            )));
        }
        Ok(())
    }

    /// 只检查协议前缀
    pub fn validate_url(url: &str, field_name: &str) -> ConfigResult<()> {
        Self::validate_not_empty(url, field_name)?;

        if !url.contains("://") {
            return Err(ConfigError::Validation(format!(
                "{field_name} 必须是带协议的URL"
            )));
        }

        Ok(())
    }

    /// LDAP DN 至少包含一个 `key=value` 片段
    pub fn validate_dn(dn: &str, field_name: &str) -> ConfigResult<()> {
        Self::validate_not_empty(dn, field_name)?;

        let valid = split_rdns(dn)
            .into_iter()
            .all(|rdn| matches!(rdn.split_once('='), Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty()));
        if !valid {
            return Err(ConfigError::Validation(format!(
                "{field_name} 不是有效的DN: {dn}"
            )));
        }

        Ok(())
    }
}

/// 按未转义的逗号拆分 DN
fn split_rdns(dn: &str) -> Vec<&str> {
    let mut rdns = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => {
                rdns.push(&dn[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    rdns.push(&dn[start..]);
    rdns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(ValidationUtils::validate_not_empty("test", "field").is_ok());
        assert!(ValidationUtils::validate_not_empty("  test  ", "field").is_ok());
        assert!(ValidationUtils::validate_not_empty("", "field").is_err());
        assert!(ValidationUtils::validate_not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_timeout_seconds() {
        assert!(ValidationUtils::validate_timeout_seconds(30, "t").is_ok());
        assert!(ValidationUtils::validate_timeout_seconds(3600, "t").is_ok());
        assert!(ValidationUtils::validate_timeout_seconds(0, "t").is_err());
        assert!(ValidationUtils::validate_timeout_seconds(3601, "t").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(ValidationUtils::validate_url("https://procurat.example", "url").is_ok());
        assert!(ValidationUtils::validate_url("ldaps://dc01.school.example:636", "url").is_ok());
        assert!(ValidationUtils::validate_url("", "url").is_err());
        assert!(ValidationUtils::validate_url("localhost:8080", "url").is_err());
    }

    #[test]
    fn test_validate_dn() {
        assert!(ValidationUtils::validate_dn("ou=Staff,dc=school,dc=example", "dn").is_ok());
        assert!(ValidationUtils::validate_dn("Staff", "dn").is_err());
        assert!(ValidationUtils::validate_dn("ou=,dc=example", "dn").is_err());
        assert!(ValidationUtils::validate_dn(
            r"cn=Berg\, Anna,ou=Staff,dc=school,dc=example",
            "dn"
        )
        .is_ok());
        assert!(ValidationUtils::validate_dn(r"cn=Berg\\,ou=Staff", "dn").is_ok());
        assert!(ValidationUtils::validate_dn(r"cn=Berg\\, Anna,ou=Staff", "dn").is_err());
    }
}
