//! Subscription gating.
//!
//! One policy function decides which features need a subscription. The
//! subscription provider is an external collaborator; when it cannot be
//! reached the user is treated as not entitled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::UserId;
use crate::error::BreatheResult;

/// User-facing features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Dashboard,
    Milestones,
    Journal,
    CoachChat,
    HealthInsights,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Dashboard,
        Feature::Milestones,
        Feature::Journal,
        Feature::CoachChat,
        Feature::HealthInsights,
    ];

    pub fn requires_subscription(&self) -> bool {
        matches!(self, Feature::CoachChat | Feature::HealthInsights)
    }
}

/// The single access policy.
pub fn can_access_feature(feature: Feature, entitled: bool) -> bool {
    entitled || !feature.requires_subscription()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
    pub product_id: Option<String>,
    pub subscription_end: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn active(product_id: impl Into<String>, subscription_end: DateTime<Utc>) -> Self {
        Self {
            subscribed: true,
            product_id: Some(product_id.into()),
            subscription_end: Some(subscription_end),
        }
    }
}

/// Subscription provider.
///
/// URLs are opaque: they are handed to the platform as-is.
#[async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn subscription_status(&self, user_id: &UserId) -> BreatheResult<SubscriptionStatus>;

    async fn is_entitled(&self, user_id: &UserId) -> BreatheResult<bool> {
        Ok(self.subscription_status(user_id).await?.subscribed)
    }

    async fn checkout_url(&self, user_id: &UserId) -> BreatheResult<String>;

    async fn portal_url(&self, user_id: &UserId) -> BreatheResult<String>;
}

/// Entitlement lookup that fails closed.
pub async fn check_entitlement(source: &dyn EntitlementSource, user_id: &UserId) -> bool {
    match source.is_entitled(user_id).await {
        Ok(entitled) => {
            tracing::debug!("🔑 [ENTITLEMENT] {} entitled: {}", user_id, entitled);
            entitled
        }
        Err(e) => {
            tracing::warn!(
                "⚠️ [ENTITLEMENT] Check failed for {}, treating as not entitled: {}",
                user_id,
                e
            );
            false
        }
    }
}

/// Fixed answer; used when no provider is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticEntitlement {
    status: SubscriptionStatus,
}

impl StaticEntitlement {
    pub fn new(status: SubscriptionStatus) -> Self {
        Self { status }
    }
}

#[async_trait]
impl EntitlementSource for StaticEntitlement {
    async fn subscription_status(&self, _user_id: &UserId) -> BreatheResult<SubscriptionStatus> {
        Ok(self.status.clone())
    }

    async fn checkout_url(&self, _user_id: &UserId) -> BreatheResult<String> {
        Err(crate::error::BreatheError::store(
            "checkout",
            "no subscription provider configured",
        ))
    }

    async fn portal_url(&self, _user_id: &UserId) -> BreatheResult<String> {
        Err(crate::error::BreatheError::store(
            "customer portal",
            "no subscription provider configured",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BreatheError;
    use chrono::TimeZone;

    struct UnreachableProvider;

    #[async_trait]
    impl EntitlementSource for UnreachableProvider {
        async fn subscription_status(
            &self,
            _user_id: &UserId,
        ) -> BreatheResult<SubscriptionStatus> {
            Err(BreatheError::store("check subscription", "timed out"))
        }

        async fn checkout_url(&self, _user_id: &UserId) -> BreatheResult<String> {
            Ok("https://checkout.invalid/session".to_string())
        }

        async fn portal_url(&self, _user_id: &UserId) -> BreatheResult<String> {
            Ok("https://portal.invalid/session".to_string())
        }
    }

    #[test]
    fn test_policy() {
        for feature in Feature::ALL {
            assert!(can_access_feature(feature, true));
        }
        assert!(can_access_feature(Feature::Dashboard, false));
        assert!(can_access_feature(Feature::Milestones, false));
        assert!(can_access_feature(Feature::Journal, false));
        assert!(!can_access_feature(Feature::CoachChat, false));
        assert!(!can_access_feature(Feature::HealthInsights, false));
    }

    #[tokio::test]
    async fn test_check_fails_closed() {
        let user = UserId::from("u1");
        assert!(!check_entitlement(&UnreachableProvider, &user).await);
    }

    #[tokio::test]
    async fn test_static_entitlement() {
        let user = UserId::from("u1");
        let end = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let subscribed = StaticEntitlement::new(SubscriptionStatus::active("prod_pro", end));
        assert!(check_entitlement(&subscribed, &user).await);

        let free = StaticEntitlement::default();
        assert!(!check_entitlement(&free, &user).await);
        tokio_test::assert_err!(free.checkout_url(&user).await);
    }
}
