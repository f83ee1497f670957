//! Share links: a share code carried in the `p` query parameter.

use tracing::info;
use url::Url;

use super::compact::CompactCodec;
use crate::catalog::CatalogProvider;
use crate::record::ProgressRecord;

pub const SHARE_PARAM: &str = "p";

/// The visible address of the running application.
pub trait Location {
    fn current(&self) -> Url;

    /// Swap the visible address without reloading.
    fn replace(&mut self, url: Url);
}

impl Location for Url {
    fn current(&self) -> Url {
        self.clone()
    }

    fn replace(&mut self, url: Url) {
        *self = url;
    }
}

/// `base` without query or fragment, with `code` percent-encoded as `p`.
pub fn share_url(base: &Url, code: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.query_pairs_mut().append_pair(SHARE_PARAM, code);
    url
}

/// The share code carried by `url`, if any.
///
/// Codes never contain spaces, so a space left by form-decoding a raw `+`
/// is turned back into `+`.
pub fn share_code(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == SHARE_PARAM)
        .map(|(_, value)| value.replace(' ', "+"))
        .filter(|code| !code.is_empty())
}

/// `url` with every `p` parameter removed. Other parameters and the fragment stay.
pub fn strip_share_code(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != SHARE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut clean = url.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}

impl<C: CatalogProvider> CompactCodec<C> {
    pub fn generate_share_url(&self, base: &Url, record: &ProgressRecord) -> Url {
        share_url(base, &self.encode(record))
    }

    /// Import progress from the `p` parameter of the current location.
    ///
    /// On success the parameter is stripped from the location so a reload does
    /// not import again. On absence or a bad code the location is untouched.
    pub fn check_url_for_progress<L: Location + ?Sized>(
        &self,
        location: &mut L,
    ) -> Option<ProgressRecord> {
        let current = location.current();
        let code = share_code(&current)?;
        let record = self.decode(&code)?;

        location.replace(strip_share_code(&current));
        info!(
            seen = record.seen.len(),
            not_seen = record.not_seen.len(),
            "imported progress from share link"
        );
        Some(record)
    }
}
