//! principal extraction from gateway headers
//!
//! the upstream gateway has already verified the caller's credential and
//! forwards the result as headers. they are decoded here, once, into a
//! [`Principal`] that handlers pass to the service layer.
use super::error::ApiError;
use crate::auth::{Permission, Principal, Role};
use axum::{extract::FromRequestParts, http::request::Parts};

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";
pub const PRINCIPAL_PERMISSIONS_HEADER: &str = "x-principal-permissions";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    match parts.headers.get(name) {
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()))
            .map_err(|_| ApiError::unauthorized(format!("Invalid {name} header"))),
        None => Ok(None),
    }
}

/// Unknown permission names are ignored
pub fn parse_permissions(value: &str) -> impl Iterator<Item = Permission> + '_ {
    value
        .split(',')
        .filter_map(|name| name.trim().parse::<Permission>().ok())
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, PRINCIPAL_ID_HEADER)?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let role = header(parts, PRINCIPAL_ROLE_HEADER)?
            .and_then(|role| role.parse::<Role>().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing or unknown principal role"))?;

        let mut principal = Principal::new(user_id, role);
        if let Some(permissions) = header(parts, PRINCIPAL_PERMISSIONS_HEADER)? {
            principal.permissions.extend(parse_permissions(permissions));
        }
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_unknown_permissions() {
        let parsed: Vec<Permission> =
            parse_permissions("read_achievements, manage_users,,verify_achievements").collect();
        assert_eq!(
            parsed,
            vec![Permission::ReadAchievements, Permission::VerifyAchievements]
        );
    }
}
