//! GlobalPlatform command definitions
//!
//! Builders for the commands exchanged during SCP03 and SCP11 handshakes,
//! and parsers for the responses the session relies on.

pub mod external_authenticate;
pub mod get_data;
pub mod get_response;
pub mod initialize_update;
pub mod mutual_authenticate;
pub mod perform_security_operation;

pub use external_authenticate::ExternalAuthenticateCommand;
pub use get_data::GetCertificatesCommand;
pub use get_response::GetResponseCommand;
pub use initialize_update::{InitializeUpdateCommand, InitializeUpdateResponse};
pub use mutual_authenticate::{KeyAgreementCommand, KeyAgreementResponse};
pub use perform_security_operation::PerformSecurityOperationCommand;
