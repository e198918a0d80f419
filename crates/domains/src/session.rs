//! # Session
//!
//! The authenticated principal handed to the core by the request layer.
//! Session storage and credential checks happen outside this workspace.

use crate::errors::{AppError, Result};
use crate::models::UserId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    principal: Option<UserId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn for_user(user: UserId) -> Self {
        Self {
            principal: Some(user),
        }
    }

    /// The viewer, if any. Read paths use this to personalise results.
    pub fn principal(&self) -> Option<UserId> {
        self.principal
    }

    /// Fails with `Unauthenticated` if nobody is logged in.
    pub fn require_principal(&self) -> Result<UserId> {
        self.principal
            .ok_or_else(|| AppError::Unauthenticated("must be logged in".into()))
    }

    pub fn assert_logged_in(&self) -> Result<()> {
        self.require_principal().map(|_| ())
    }

    pub fn assert_logged_out(&self) -> Result<()> {
        match self.principal {
            Some(_) => Err(AppError::not_allowed("must be logged out")),
            None => Ok(()),
        }
    }
}
