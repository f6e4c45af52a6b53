//! Domain models

pub mod common;
pub mod instance;
pub mod respondent;

pub use common::StringUuid;
pub use instance::{
    AuthType, CreateInstanceInput, Instance, InstanceStatus, InstanceStatusView, NewInstance,
    UpdateInstanceInput, WILDCARD_DOMAIN,
};
pub use respondent::{
    CreateRespondentInput, NewRespondent, OwnerAccount, Respondent, RespondentOrigin,
    UpdateRespondentInput, VerifiedIdentity,
};
