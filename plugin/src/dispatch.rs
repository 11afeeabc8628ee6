// Command dispatch table — the stringly-typed entry point hosts call
//
// Options are validated before the lifecycle guard runs, and both
// happen before the engine is reached. Unknown command names reject
// like any other validation failure.

use serde_json::Value;

use meshbridge_core::error::{BridgeError, ValidationError};

use crate::options::{
    EstablishSecureConnectionOptions, FingerprintOptions, InitializeOptions,
    IsFingerprintValidOptions, RequestPermissionsOptions, SendOptions, StartOptions,
};
use crate::results::{
    to_wire, ConnectedPeersResult, CurrentUserIdResult, FingerprintResult, IsFingerprintValidResult,
    IsInitializedResult, IsStartedResult, LicenseExpirationDateResult, SendResult,
};
use crate::MeshBridge;

/// Wire names of every command the bridge accepts.
pub mod command {
    pub const INITIALIZE: &str = "initialize";
    pub const IS_INITIALIZED: &str = "isInitialized";
    pub const START: &str = "start";
    pub const IS_STARTED: &str = "isStarted";
    pub const STOP: &str = "stop";
    pub const LICENSE_EXPIRATION_DATE: &str = "licenseExpirationDate";
    pub const UPDATE_LICENSE: &str = "updateLicense";
    pub const DESTROY_SESSION: &str = "destroySession";
    pub const CURRENT_USER_ID: &str = "currentUserID";
    pub const CONNECTED_PEERS: &str = "connectedPeers";
    pub const ESTABLISH_SECURE_CONNECTION: &str = "establishSecureConnection";
    pub const FINGERPRINT: &str = "fingerprint";
    pub const IS_FINGERPRINT_VALID: &str = "isFingerprintValid";
    pub const SEND: &str = "send";
    pub const CHECK_PERMISSIONS: &str = "checkPermissions";
    pub const REQUEST_PERMISSIONS: &str = "requestPermissions";
}

impl MeshBridge {
    /// Uniform command entry point: a name and a loose options object in,
    /// an optional result object or a structured rejection out.
    pub async fn invoke(
        &self,
        command_name: &str,
        options: Option<Value>,
    ) -> Result<Option<Value>, BridgeError> {
        tracing::debug!(command = command_name, "invoke");
        let options = options.as_ref();

        match command_name {
            command::INITIALIZE => {
                self.initialize(InitializeOptions::from_value(options)).await?;
                Ok(None)
            }
            command::IS_INITIALIZED => Ok(Some(to_wire(&IsInitializedResult {
                is_initialized: self.is_initialized().await,
            }))),
            command::START => {
                self.start(StartOptions::from_value(options)).await?;
                Ok(None)
            }
            command::IS_STARTED => Ok(Some(to_wire(&IsStartedResult {
                is_started: self.is_started().await,
            }))),
            command::STOP => {
                self.stop().await?;
                Ok(None)
            }
            command::LICENSE_EXPIRATION_DATE => Ok(Some(to_wire(&LicenseExpirationDateResult {
                license_expiration_date: self.license_expiration_date().await?,
            }))),
            command::UPDATE_LICENSE => {
                self.update_license().await?;
                Ok(None)
            }
            command::DESTROY_SESSION => {
                self.destroy_session().await?;
                Ok(None)
            }
            command::CURRENT_USER_ID => Ok(Some(to_wire(&CurrentUserIdResult {
                user_id: self.current_user_id().await?,
            }))),
            command::CONNECTED_PEERS => Ok(Some(to_wire(&ConnectedPeersResult {
                peers: self.connected_peers().await?,
            }))),
            command::ESTABLISH_SECURE_CONNECTION => {
                let parsed = EstablishSecureConnectionOptions::from_value(options)?;
                self.establish_secure_connection(parsed).await?;
                Ok(None)
            }
            command::FINGERPRINT => {
                let parsed = FingerprintOptions::from_value(options)?;
                let fingerprint = self.fingerprint(parsed).await?;
                Ok(Some(to_wire(&FingerprintResult::new(fingerprint))))
            }
            command::IS_FINGERPRINT_VALID => {
                let parsed = IsFingerprintValidOptions::from_value(options)?;
                Ok(Some(to_wire(&IsFingerprintValidResult {
                    is_valid: self.is_fingerprint_valid(parsed).await?,
                })))
            }
            command::SEND => {
                let parsed = SendOptions::from_value(options)?;
                Ok(Some(to_wire(&SendResult {
                    message_id: self.send(parsed).await?,
                })))
            }
            command::CHECK_PERMISSIONS => Ok(Some(to_wire(&self.check_permissions().await))),
            command::REQUEST_PERMISSIONS => {
                let parsed = RequestPermissionsOptions::from_value(options);
                Ok(Some(to_wire(&self.request_permissions(parsed).await?)))
            }
            other => Err(ValidationError::UnknownCommand(other.to_string()).into()),
        }
    }
}
