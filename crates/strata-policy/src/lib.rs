//! Strata policy: validation of deployment requests.
//!
//! Validators are pure and order-independent. They never stop at the first
//! problem; every violated rule is reported so operators can fix a request in
//! one pass. Nothing here touches the stack engine.

pub mod error;
pub mod rules;
pub mod tenant;
pub mod validator;

pub use error::{ConfigurationError, ValidationReport};
pub use rules::MAX_TENANT_ID_LEN;
pub use tenant::{resolve_tenant_app_config, validate_tenant_app_config};
pub use validator::{resolve_deployment_context, validate_deployment_context};
