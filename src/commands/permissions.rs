//! Capture permission checks
//!
//! Camera and microphone access are required. The notification or storage
//! permission is requested alongside them but never blocks the session.

use crate::utils::{AppError, ErrorResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// First platform API level with a runtime notification permission
pub const NOTIFICATION_PERMISSION_API_LEVEL: u32 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    Camera,
    RecordAudio,
    PostNotifications,
    WriteExternalStorage,
}

pub fn core_permissions() -> [Permission; 2] {
    [Permission::Camera, Permission::RecordAudio]
}

pub fn optional_permissions(api_level: u32) -> Vec<Permission> {
    if api_level >= NOTIFICATION_PERMISSION_API_LEVEL {
        vec![Permission::PostNotifications]
    } else {
        vec![Permission::WriteExternalStorage]
    }
}

/// Everything to ask the user for in one request
pub fn requested_permissions(api_level: u32) -> Vec<Permission> {
    let mut permissions = core_permissions().to_vec();
    permissions.extend(optional_permissions(api_level));
    permissions
}

/// Succeeds when every core permission is granted. Optional permissions are
/// only logged.
pub fn check_permissions(
    granted: &HashMap<Permission, bool>,
    api_level: u32,
) -> Result<(), ErrorResponse> {
    let is_granted = |permission: &Permission| granted.get(permission).copied().unwrap_or(false);

    for permission in optional_permissions(api_level) {
        tracing::debug!(
            "Optional permission {:?}: {}",
            permission,
            if is_granted(&permission) { "granted" } else { "not granted" }
        );
    }

    let missing: Vec<String> = core_permissions()
        .iter()
        .filter(|permission| !is_granted(*permission))
        .map(|permission| format!("{:?}", permission))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::warn!("Missing core permissions: {:?}", missing);
        Err(AppError::PermissionDenied(missing.join(", ")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_permission_depends_on_api_level() {
        assert_eq!(
            requested_permissions(33),
            vec![
                Permission::Camera,
                Permission::RecordAudio,
                Permission::PostNotifications
            ]
        );
        assert_eq!(
            optional_permissions(29),
            vec![Permission::WriteExternalStorage]
        );
    }

    #[test]
    fn test_optional_permissions_do_not_block() {
        let granted = HashMap::from([
            (Permission::Camera, true),
            (Permission::RecordAudio, true),
            (Permission::PostNotifications, false),
        ]);
        assert!(check_permissions(&granted, 34).is_ok());
    }

    #[test]
    fn test_missing_microphone_is_denied() {
        let granted = HashMap::from([(Permission::Camera, true)]);
        let err = check_permissions(&granted, 34).unwrap_err();
        assert_eq!(err.code, "PERMISSION_DENIED");
        assert!(err.message.contains("RecordAudio"));
    }
}
