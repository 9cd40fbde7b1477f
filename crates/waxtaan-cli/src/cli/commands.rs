use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{json, Value};
use waxtaan_core::models::{
    Attachment, Group, Identity, MemberInfo, OutgoingMessage, ProfileUpdate, User,
};
use waxtaan_core::validation::{
    validate_login, validate_message, validate_new_group, validate_registration,
};
use waxtaan_core::{
    ApiClient, ApiError, ChatStore, ConversationKey, CoreConfig, CoreError, PollEvent, Poller,
    TokenStore,
};

use super::output;

/// Everything a command needs: resolved config, API client and token store
pub struct Session {
    config: CoreConfig,
    api: ApiClient,
    tokens: TokenStore,
}

impl Session {
    pub fn new(config: CoreConfig) -> Result<Self> {
        let api = ApiClient::new(&config.api_base_url)
            .with_context(|| format!("Invalid API URL: {}", config.api_base_url))?;
        let tokens = TokenStore::new(&config.data_dir);
        Ok(Self {
            config,
            api,
            tokens,
        })
    }

    /// API client carrying the stored token
    fn authed(&self) -> Result<ApiClient> {
        match self.tokens.token()? {
            Some(token) => Ok(self.api.clone().with_token(token)),
            None => bail!("Not logged in. Run `waxtaan login` first."),
        }
    }

    fn poller(&self) -> Poller {
        Poller::new(
            self.api.clone(),
            Arc::new(RwLock::new(ChatStore::new())),
            self.tokens.clone(),
        )
    }

    /// One reconciliation pass into a fresh store
    async fn reconciled_store(&self) -> Result<Arc<RwLock<ChatStore>>> {
        let poller = self.poller();
        poller.run_pass_once().await.map_err(explain)?;
        Ok(poller.store().clone())
    }

    // ===== Account =====

    pub async fn login(&self, username: &str, password: &str) -> Result<Value> {
        validate_login(username, password)?;
        let token = self
            .api
            .login(username.trim(), password)
            .await
            .map_err(|e| explain(e.into()))?;
        self.tokens.set_token(&token)?;
        Ok(json!({ "loggedIn": true }))
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
        avatar: Option<&Path>,
    ) -> Result<Value> {
        validate_registration(username, password, confirm)?;
        let avatar = avatar.map(read_attachment).transpose()?;
        let token = self.api.register(username.trim(), password, avatar).await?;
        if let Some(token) = &token {
            self.tokens.set_token(token)?;
        }
        Ok(json!({ "registered": true, "loggedIn": token.is_some() }))
    }

    pub fn logout(&self) -> Result<Value> {
        self.tokens.clear_token()?;
        Ok(json!({ "loggedIn": false }))
    }

    pub async fn me(&self) -> Result<Value> {
        let me = self.authed()?.current_user().await.map_err(|e| explain(e.into()))?;
        Ok(output::user(&me))
    }

    /// Update name, status, password or avatar. Unset name and status keep
    /// their current values.
    pub async fn update_profile(
        &self,
        name: Option<String>,
        status: Option<String>,
        password: Option<String>,
        avatar: Option<&Path>,
    ) -> Result<Value> {
        let api = self.authed()?;
        let me = api.current_user().await.map_err(|e| explain(e.into()))?;
        let update = ProfileUpdate {
            name: name.unwrap_or(me.name),
            status: status.unwrap_or(me.status),
            password,
            avatar: avatar.map(read_attachment).transpose()?,
        };
        let user = api.update_profile(&update).await?;
        Ok(output::user(&user))
    }

    /// Contacts of the logged-in user; ones that cannot be looked up are left out
    pub async fn contacts(&self) -> Result<Value> {
        let api = self.authed()?;
        let me = api.current_user().await.map_err(|e| explain(e.into()))?;
        let contacts: Vec<Value> = api.contacts(&me).await.iter().map(output::contact).collect();
        Ok(json!({ "contacts": contacts }))
    }

    /// Add a contact, then list conversations with the new one selected
    pub async fn add_contact(&self, username: &str) -> Result<Value> {
        let api = self.authed()?;
        let me = api.current_user().await.map_err(|e| explain(e.into()))?;
        let contact = api
            .get_user_by_username(username)
            .await
            .with_context(|| format!("No user named {}", username))?;
        api.add_contact(&me.id, &contact.id).await?;

        let store = self.reconciled_store().await?;
        let mut store = store.write();
        Ok(show_new_contact(&mut store, &contact))
    }

    // ===== Conversations =====

    pub async fn conversations(&self) -> Result<Value> {
        let store = self.reconciled_store().await?;
        let store = store.read();
        Ok(output::conversation_list(&store))
    }

    /// Select a conversation after one pass and print its messages
    pub async fn show(&self, key: &str) -> Result<Value> {
        let key: ConversationKey = key.parse()?;
        let store = self.reconciled_store().await?;
        let mut store = store.write();
        let Some(conversation) = store.conversation(&key) else {
            bail!("No conversation {}", key);
        };
        let unread_before = store.unread_count(&key);
        let detail = output::conversation_detail(conversation, unread_before);
        store.select_conversation(key);
        Ok(detail)
    }

    pub async fn send(&self, key: &str, text: &str, file: Option<&Path>) -> Result<Value> {
        let key: ConversationKey = key.parse()?;
        validate_message(text, file.is_some())?;
        let attachment = file.map(read_attachment).transpose()?;

        let api = self.authed()?;
        let me = api.current_user().await.map_err(|e| explain(e.into()))?;
        let outgoing = OutgoingMessage::new(
            me.id,
            key.id.clone(),
            text.trim(),
            attachment.is_some(),
            Utc::now(),
        );
        api.send_message(&outgoing, attachment).await?;
        Ok(json!({ "sent": true, "conversation": key.to_string() }))
    }

    /// Create a group with the given members (the caller is always included),
    /// then list conversations with the group selected
    pub async fn create_group(&self, name: &str, members: Vec<String>) -> Result<Value> {
        let mut members: Vec<Identity> = members.into_iter().map(Identity::from).collect();
        let name = validate_new_group(name, &members)?;

        let api = self.authed()?;
        let me = api.current_user().await.map_err(|e| explain(e.into()))?;
        if !members.contains(&me.id) {
            members.push(me.id.clone());
        }
        let group = api.create_group(&name, &members).await?;
        let members = member_infos(&group.members, api.get_users(&group.members).await);

        let store = self.reconciled_store().await?;
        let mut store = store.write();
        Ok(show_created_group(&mut store, &group, members))
    }

    /// Poll until Ctrl-C, printing the conversation list after every pass
    pub async fn watch(&self, pretty: bool) -> Result<()> {
        let poller = self.poller();
        let store = poller.store().clone();
        let mut handle = poller.spawn(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    handle.cancel();
                    break;
                }
                event = handle.next_event() => match event {
                    Some(PollEvent::Reconciled { pass }) => {
                        let mut value = output::conversation_list(&store.read());
                        value["pass"] = json!(pass);
                        output::print_json(&value, pretty)?;
                    }
                    Some(PollEvent::PassFailed { pass, error }) => {
                        eprintln!("Pass {} failed, retrying: {}", pass, error);
                    }
                    Some(PollEvent::NotAuthenticated) => {
                        handle.cancel();
                        bail!("Not logged in. Run `waxtaan login` first.");
                    }
                    None => break,
                },
            }
        }
        Ok(())
    }
}

/// Open the private conversation with a just-added contact and render the
/// list around it
fn show_new_contact(store: &mut ChatStore, contact: &User) -> Value {
    store.open_conversation_with(contact.id.clone(), contact.profile());
    output::conversation_list(store)
}

/// Show a just-created group even if the server does not list it yet
fn show_created_group(store: &mut ChatStore, group: &Group, members: Vec<MemberInfo>) -> Value {
    store.create_group_locally(&group.name, members, Some(group.id.clone()));
    output::conversation_list(store)
}

/// Member names for display; a failed lookup shows the raw id
fn member_infos(ids: &[Identity], lookups: Vec<Result<User, ApiError>>) -> Vec<MemberInfo> {
    ids.iter()
        .zip(lookups)
        .map(|(id, lookup)| MemberInfo {
            id: id.clone(),
            name: lookup
                .map(|user| user.display_name().to_string())
                .unwrap_or_else(|_| id.to_string()),
        })
        .collect()
}

fn read_attachment(path: &Path) -> Result<Attachment> {
    Attachment::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Turn auth failures into a hint to log in; pass everything else through
fn explain(error: CoreError) -> anyhow::Error {
    if error.is_auth_failure() {
        anyhow::anyhow!("Not logged in. Run `waxtaan login` first.")
    } else {
        error.into()
    }
}
