// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upload context handed to request builders

/// Host-level facts every request carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadContext {
    /// Credential accepted by the intake
    pub client_token: String,
    /// Producer identifier, e.g. `rust`
    pub source: String,
    pub sdk_version: String,
    pub service: Option<String>,
    pub env: Option<String>,
    pub app_version: Option<String>,
}

impl UploadContext {
    pub fn new(client_token: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            client_token: client_token.into(),
            source: source.into(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            ..Self::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }
}

/// Supplies the context current at upload time
pub trait ContextProvider: Send + Sync + 'static {
    fn context(&self) -> UploadContext;
}

impl ContextProvider for UploadContext {
    fn context(&self) -> UploadContext {
        self.clone()
    }
}
