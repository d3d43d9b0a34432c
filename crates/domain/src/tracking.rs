//! # 追跡トークン
//!
//! 送信ごとに一意な追跡トークンを発行し、開封・クリック計測用 URL を組み立てる。
//!
//! ## URL 形式
//!
//! ```text
//! {base_url}/api/email/track/open?trackingId={id}
//! {base_url}/api/email/track/click?trackingId={id}&url={target}
//! ```
//!
//! 計測エンドポイント自体は別サービスが提供する。ここでは URL の生成のみを担う。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use crate::clock::Clock;

/// 開封計測エンドポイントのパス
pub const OPEN_TRACKING_PATH: &str = "/api/email/track/open";
/// クリック計測エンドポイントのパス
pub const CLICK_TRACKING_PATH: &str = "/api/email/track/click";

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// 追跡トークン
///
/// 送信ごとにレンダリング前に発行され、再利用されない。
/// 下流には不透明な相関キーとしてのみ渡す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingToken {
    id:         String,
    created_at: DateTime<Utc>,
}

impl TrackingToken {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// 追跡トークン発行サービス
///
/// ID は `{発行時刻ミリ秒}-{base36 乱数 9 桁}`。
/// 同一ミリ秒内でも乱数部で区別する（衝突確率は無視できる程度）。
#[derive(Clone)]
pub struct TrackingTokenService {
    clock: Arc<dyn Clock>,
}

impl TrackingTokenService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// 新しい追跡トークンを発行する
    pub fn mint(&self) -> TrackingToken {
        let created_at = self.clock.now();
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();

        TrackingToken {
            id: format!("{}-{suffix}", created_at.timestamp_millis()),
            created_at,
        }
    }
}

/// 開封計測 URL を組み立てる
pub fn build_open_url(token: &TrackingToken, base_url: &str) -> String {
    format!(
        "{}{OPEN_TRACKING_PATH}?trackingId={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token.id())
    )
}

/// クリック計測 URL を組み立てる
///
/// `target_url` はクエリ文字列を含めて丸ごとエンコードされる。
pub fn build_click_url(token: &TrackingToken, base_url: &str, target_url: &str) -> String {
    format!(
        "{}{CLICK_TRACKING_PATH}?trackingId={}&url={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token.id()),
        urlencoding::encode(target_url)
    )
}

/// 1 通分の計測 URL 一式
///
/// テンプレートレンダラーに渡し、リンクはすべて [`TrackingUrls::click_url`] を通させる。
#[derive(Debug, Clone)]
pub struct TrackingUrls {
    token:    TrackingToken,
    base_url: String,
}

impl TrackingUrls {
    pub fn new(token: TrackingToken, base_url: impl Into<String>) -> Self {
        Self {
            token,
            base_url: base_url.into(),
        }
    }

    pub fn token(&self) -> &TrackingToken {
        &self.token
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn open_url(&self) -> String {
        build_open_url(&self.token, &self.base_url)
    }

    pub fn click_url(&self, target_url: &str) -> String {
        build_click_url(&self.token, &self.base_url, target_url)
    }
}
