//! Query parameter types shared by several handler modules.

use learnhub_core::error::CoreError;
use learnhub_core::types::DbId;
use serde::Deserialize;

/// Largest page a listing endpoint hands out.
pub const MAX_LIMIT: i64 = 100;

/// `?limit=` on listings that only page from the newest row.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub fn clamped_limit(&self) -> Option<i64> {
        self.limit.map(|l| l.clamp(1, MAX_LIMIT))
    }
}

/// `?include_inactive=true` on list endpoints of soft-deactivated entities.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}

/// `?ids=1,2,3` for the traversal endpoints.
#[derive(Debug, Deserialize)]
pub struct IdsParams {
    pub ids: String,
}

impl IdsParams {
    pub fn parse(&self) -> Result<Vec<DbId>, CoreError> {
        let ids = self
            .ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<DbId>()
                    .map_err(|_| CoreError::Validation(format!("'{s}' is not a valid id")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if ids.is_empty() {
            return Err(CoreError::Validation("At least one id is required".into()));
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_and_reject_garbage() {
        let params = IdsParams {
            ids: "3, 1,,7".to_string(),
        };
        assert_eq!(params.parse().unwrap(), vec![3, 1, 7]);

        let bad = IdsParams { ids: "1,x".into() };
        assert!(bad.parse().is_err());

        let empty = IdsParams { ids: " ".into() };
        assert!(empty.parse().is_err());
    }

    #[test]
    fn limit_is_clamped() {
        let params = PaginationParams { limit: Some(5000) };
        assert_eq!(params.clamped_limit(), Some(MAX_LIMIT));
        assert_eq!(PaginationParams { limit: Some(0) }.clamped_limit(), Some(1));
        assert_eq!(PaginationParams::default().clamped_limit(), None);
    }
}
