//! プロバイダレジストリ
//!
//! 設定の有無から起動時に一度だけ組み立てる、Server / Secondary の送信プロバイダの組。
//! 能力スナップショットも構築時に確定し、送信中は変化しない。

use std::sync::Arc;

use notifly_domain::notification::{ProviderCapability, ProviderRole};

use super::NotificationSender;

/// 送信プロバイダの組
///
/// ユースケースには `Arc<ProviderRegistry>` として注入する。
/// テストではモック送信を任意の役割に差し込める。
#[derive(Clone)]
pub struct ProviderRegistry {
    server:       Option<Arc<dyn NotificationSender>>,
    secondary:    Option<Arc<dyn NotificationSender>>,
    capabilities: Vec<ProviderCapability>,
}

impl ProviderRegistry {
    pub fn new(
        server: Option<Arc<dyn NotificationSender>>,
        secondary: Option<Arc<dyn NotificationSender>>,
    ) -> Self {
        let capabilities = [
            (ProviderRole::Server, &server),
            (ProviderRole::Secondary, &secondary),
        ]
        .into_iter()
        .filter_map(|(role, sender)| {
            sender.as_ref().map(|sender| {
                ProviderCapability::new(sender.name(), role, sender.supports_attachments(), true)
            })
        })
        .collect();

        Self {
            server,
            secondary,
            capabilities,
        }
    }

    /// プロバイダが 1 つも設定されていないレジストリ
    pub fn empty() -> Self {
        Self::new(None, None)
    }

    /// 利用可能なプロバイダの能力スナップショット
    pub fn get_available(&self) -> &[ProviderCapability] {
        &self.capabilities
    }

    /// 役割に対応する送信プロバイダ
    pub fn sender(&self, role: ProviderRole) -> Option<&Arc<dyn NotificationSender>> {
        match role {
            ProviderRole::Server => self.server.as_ref(),
            ProviderRole::Secondary => self.secondary.as_ref(),
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
