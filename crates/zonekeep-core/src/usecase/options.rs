// ── Checker option layers ──

use std::sync::Arc;

use crate::checker::{AutoFill, CheckerRegistry, OptionLayers, merge_options, stored_options_no_default};
use crate::error::CoreError;
use crate::model::{CheckerOptions, Identifier};
use crate::store::Storage;

#[derive(Debug, Clone)]
pub struct CheckerOptionsUsecase {
    storage: Storage,
    checkers: Arc<CheckerRegistry>,
}

impl CheckerOptionsUsecase {
    pub fn new(storage: Storage, checkers: Arc<CheckerRegistry>) -> Self {
        Self { storage, checkers }
    }

    /// Load the stored layers that apply to a target. A layer is only
    /// read when every scope above it is known.
    pub async fn layers(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
    ) -> Result<OptionLayers, CoreError> {
        let mut layers = OptionLayers {
            admin: self.load(checker, None, None, None).await?,
            ..OptionLayers::default()
        };
        let Some(user) = user else {
            return Ok(layers);
        };
        layers.user = self.load(checker, Some(user), None, None).await?;
        let Some(domain) = domain else {
            return Ok(layers);
        };
        layers.domain = self.load(checker, Some(user), Some(domain), None).await?;
        if let Some(service) = service {
            layers.service = self
                .load(checker, Some(user), Some(domain), Some(service))
                .await?;
        }
        Ok(layers)
    }

    async fn load(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
    ) -> Result<CheckerOptions, CoreError> {
        Ok(self
            .storage
            .get_checker_options(checker, user, domain, service)
            .await?
            .unwrap_or_default())
    }

    /// Effective options for one run: defaults, stored layers, context
    /// auto-fill, then run-time overrides.
    pub async fn build_merged_checker_options(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
        auto_fill: &AutoFill,
        run_opts: &CheckerOptions,
    ) -> Result<CheckerOptions, CoreError> {
        let defaults = self.checkers.get(checker)?.options().defaults();
        let layers = self.layers(checker, user, domain, service).await?;
        Ok(merge_options(&defaults, &layers, auto_fill, run_opts))
    }

    /// Stored values only, for editing: each key from the last layer that set it.
    pub async fn get_stored_checker_options_no_default(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
    ) -> Result<CheckerOptions, CoreError> {
        self.checkers.get(checker)?;
        let layers = self.layers(checker, user, domain, service).await?;
        Ok(stored_options_no_default(&layers))
    }

    /// Replace one layer; an empty map removes it.
    pub async fn set_checker_options(
        &self,
        checker: &str,
        user: Option<&Identifier>,
        domain: Option<&Identifier>,
        service: Option<&Identifier>,
        options: &CheckerOptions,
    ) -> Result<(), CoreError> {
        self.checkers.get(checker)?;
        if (domain.is_some() && user.is_none()) || (service.is_some() && domain.is_none()) {
            return Err(CoreError::validation(
                "option layers must name every enclosing scope",
            ));
        }
        if options.is_empty() {
            self.storage
                .delete_checker_options(checker, user, domain, service)
                .await?;
            return Ok(());
        }
        self.storage
            .put_checker_options(checker, user, domain, service, options)
            .await
    }
}
