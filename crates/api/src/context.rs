use gateway_core::AccountId;

/// The account a request acts as, resolved from its `X-API-Key` header.
///
/// Present on every route behind the API key middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    account_id: AccountId,
    api_key: String,
}

impl AccountContext {
    pub fn new(account_id: AccountId, api_key: impl Into<String>) -> Self {
        Self {
            account_id,
            api_key: api_key.into(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn owns(&self, account_id: AccountId) -> bool {
        self.account_id == account_id
    }
}
