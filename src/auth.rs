//! 登录态模块
//!
//! 身份认证由外部服务完成，这里只保留认证结果：当前会话是否登录、登录邮箱是什么。
//! 写操作通过 `require_signed_in` 统一把关。

use crate::error::AppError;
use crate::settings::SiteConfig;

/// 当前会话。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    email: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.email.is_some()
    }

    /// 要求已登录，返回登录邮箱。
    pub fn require_signed_in(&self) -> Result<&str, AppError> {
        self.email()
            .ok_or_else(|| AppError::Unauthorized("请先登录".to_string()))
    }

    /// 当前会话对应的作者 ID。
    pub fn author<'c>(&self, config: &'c SiteConfig) -> &'c str {
        config.author_for_email(self.email())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_session_is_rejected_for_writes() {
        let session = Session::anonymous();
        assert!(!session.is_signed_in());
        assert!(matches!(session.require_signed_in(), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn signed_in_session_maps_to_author() {
        let config = SiteConfig::default();
        let session = Session::signed_in("sayang@anya.com");
        assert_eq!(session.require_signed_in().ok(), Some("sayang@anya.com"));
        assert_eq!(session.author(&config), "anya");
    }
}
