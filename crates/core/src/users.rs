//! User records and caller identities.
//!
//! Authentication happens upstream; by the time a request reaches the
//! engine it carries a username. The [`UserDirectory`] maps that name to an
//! [`Identity`]: the role bundle the access model is consulted with, plus the
//! user's preferred initial state for new documents.
//!
//! User files are TOML tables (or JSON objects) keyed by user id:
//!
//! ```toml
//! ["jane.doe@example.edu"]
//! display_name = "Jane Doe"
//! create_queue = "deposit"
//! member_of = ["deposit"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::access::{AccessModel, RoleSet};
use crate::config::read_config_file;
use crate::error::{ConfigError, UserAdminError};

/// Minimal user information. Never holds secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    /// Initial state for documents this user creates without declaring one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_queue: Option<String>,
    /// Role names.
    #[serde(default)]
    pub member_of: Vec<String>,
}

/// On-disk shape: the user id is the table key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct UserRecord {
    #[serde(default)]
    display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    create_queue: Option<String>,
    #[serde(default)]
    member_of: Vec<String>,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        UserRecord {
            display_name: user.display_name.clone(),
            create_queue: user.create_queue.clone(),
            member_of: user.member_of.clone(),
        }
    }
}

impl User {
    /// The user as a one-entry TOML table, the same shape a users file
    /// holds.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let table = BTreeMap::from([(self.user_id.clone(), UserRecord::from(self))]);
        toml::to_string(&table)
    }
}

fn usable_create_queue(model: &AccessModel, queue: &str) -> bool {
    let workflow = model.workflow();
    workflow.is_known_state(queue) && !workflow.is_deleted(queue)
}

/// Who is calling, as far as the engine cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    pub roles: RoleSet,
    /// Preferred initial state on create; the model default applies if unset.
    pub create_state: Option<String>,
}

impl Identity {
    pub fn new<I, S>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Identity {
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            create_state: None,
        }
    }

    pub fn with_create_state(mut self, state: impl Into<String>) -> Self {
        self.create_state = Some(state.into());
        self
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Identity {
            username: user.user_id.clone(),
            roles: user.member_of.iter().cloned().collect(),
            create_state: user.create_queue.clone(),
        }
    }
}

/// All known users, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: BTreeMap<String, User>,
}

impl UserDirectory {
    /// Load a user file and check each user's `create_queue` against the
    /// model. Role names are not checked: unknown roles simply grant nothing.
    pub fn load(path: &Path, model: &AccessModel) -> Result<Self, ConfigError> {
        let records: BTreeMap<String, UserRecord> = read_config_file(path)?;
        let users = records
            .into_iter()
            .map(|(user_id, r)| User {
                user_id,
                display_name: r.display_name,
                create_queue: r.create_queue,
                member_of: r.member_of,
            })
            .collect();
        let directory = UserDirectory::from_users(users);
        directory.check(path, model)?;
        Ok(directory)
    }

    pub fn from_users(users: Vec<User>) -> Self {
        UserDirectory {
            users: users.into_iter().map(|u| (u.user_id.clone(), u)).collect(),
        }
    }

    fn check(&self, path: &Path, model: &AccessModel) -> Result<(), ConfigError> {
        for user in self.users.values() {
            if user.user_id.trim().is_empty() {
                return Err(ConfigError::InvalidUser {
                    path: path.to_path_buf(),
                    user_id: user.user_id.clone(),
                    reason: "user id must not be blank".to_string(),
                });
            }
            if let Some(queue) = &user.create_queue {
                if !usable_create_queue(model, queue) {
                    return Err(ConfigError::InvalidUser {
                        path: path.to_path_buf(),
                        user_id: user.user_id.clone(),
                        reason: format!("create_queue '{}' is not a usable state", queue),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    /// Resolve a username into the identity the engine authorizes with.
    pub fn resolve(&self, username: &str) -> Option<Identity> {
        self.users.get(username).map(Identity::from)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Users sorted by id.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    // ── Administration ──────────────────────────────────────────────────────

    /// Add a new user. Roles must be defined by `model` and `create_queue`,
    /// when set, must be a state documents can be created in.
    pub fn add_user(&mut self, user: User, model: &AccessModel) -> Result<(), UserAdminError> {
        if user.user_id.trim().is_empty() || user.user_id.trim() != user.user_id {
            return Err(UserAdminError::BlankUserId);
        }
        if self.users.contains_key(&user.user_id) {
            return Err(UserAdminError::DuplicateUser(user.user_id));
        }
        if let Some(queue) = &user.create_queue {
            if !usable_create_queue(model, queue) {
                return Err(UserAdminError::UnusableCreateQueue(queue.clone()));
            }
        }
        if let Some(role) = user
            .member_of
            .iter()
            .find(|r| !model.registry().is_known_role(r))
        {
            return Err(UserAdminError::UnknownRole(role.clone()));
        }
        self.users.insert(user.user_id.clone(), user);
        Ok(())
    }

    pub fn remove_user(&mut self, user_id: &str) -> Result<User, UserAdminError> {
        self.users
            .remove(user_id)
            .ok_or_else(|| UserAdminError::UnknownUser(user_id.to_string()))
    }

    /// Add `role` to a user's `member_of`. Refuses duplicates and roles the
    /// model does not define.
    pub fn add_role(
        &mut self,
        user_id: &str,
        role: &str,
        model: &AccessModel,
    ) -> Result<(), UserAdminError> {
        if !model.registry().is_known_role(role) {
            return Err(UserAdminError::UnknownRole(role.to_string()));
        }
        let user = self.user_mut(user_id)?;
        if user.member_of.iter().any(|r| r == role) {
            return Err(UserAdminError::AlreadyMember {
                user_id: user_id.to_string(),
                role: role.to_string(),
            });
        }
        user.member_of.push(role.to_string());
        Ok(())
    }

    /// Remove every occurrence of `role` from a user's `member_of`.
    pub fn remove_role(&mut self, user_id: &str, role: &str) -> Result<(), UserAdminError> {
        let user = self.user_mut(user_id)?;
        let before = user.member_of.len();
        user.member_of.retain(|r| r != role);
        if user.member_of.len() == before {
            return Err(UserAdminError::NotAMember {
                user_id: user_id.to_string(),
                role: role.to_string(),
            });
        }
        Ok(())
    }

    fn user_mut(&mut self, user_id: &str) -> Result<&mut User, UserAdminError> {
        self.users
            .get_mut(user_id)
            .ok_or_else(|| UserAdminError::UnknownUser(user_id.to_string()))
    }

    /// Write the directory back out, TOML or JSON by extension.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let records: BTreeMap<&str, UserRecord> = self
            .users
            .values()
            .map(|u| (u.user_id.as_str(), UserRecord::from(u)))
            .collect();
        let render_err = |message: String| ConfigError::Render {
            path: path.to_path_buf(),
            message,
        };
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::to_string(&records).map_err(|e| render_err(e.to_string()))?,
            Some("json") => {
                serde_json::to_string_pretty(&records).map_err(|e| render_err(e.to_string()))?
            }
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                })
            }
        };
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MODEL: &str = r#"
[workflow]
default_state = "deposit"
[[workflow.states]]
name = "deposit"
index = 0
[[workflow.states]]
name = "review"
index = 1
"#;

    fn model() -> AccessModel {
        crate::config::ModelConfig::from_toml_str(MODEL)
            .unwrap()
            .into_model("model.toml")
            .unwrap()
    }

    fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_toml_keyed_by_user_id() {
        let f = write_file(
            ".toml",
            r#"
# Example users file
["jane.doe@example.edu"]
display_name = "Jane Doe"
create_queue = "deposit"
member_of = ["deposit"]
"#,
        );
        let dir = UserDirectory::load(f.path(), &model()).unwrap();
        assert_eq!(dir.len(), 1);
        let jane = dir.get("jane.doe@example.edu").unwrap();
        assert_eq!(jane.display_name, "Jane Doe");

        let id = dir.resolve("jane.doe@example.edu").unwrap();
        assert_eq!(id.username, "jane.doe@example.edu");
        assert!(id.roles.contains("deposit"));
        assert_eq!(id.create_state.as_deref(), Some("deposit"));
        assert!(dir.resolve("someone.else").is_none());
    }

    #[test]
    fn loads_json() {
        let f = write_file(
            ".json",
            r#"{"ed": {"display_name": "Ed", "member_of": ["editor", "reviewer"]}}"#,
        );
        let dir = UserDirectory::load(f.path(), &model()).unwrap();
        let id = dir.resolve("ed").unwrap();
        assert_eq!(id.roles.len(), 2);
        assert_eq!(id.create_state, None);
    }

    #[test]
    fn rejects_unknown_create_queue() {
        let f = write_file(".toml", "[ed]\ncreate_queue = \"limbo\"\n");
        let err = UserDirectory::load(f.path(), &model()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUser { user_id, .. } if user_id == "ed"));
    }

    #[test]
    fn rejects_deleted_create_queue() {
        let f = write_file(".toml", "[ed]\ncreate_queue = \"deleted\"\n");
        assert!(UserDirectory::load(f.path(), &model()).is_err());
    }

    #[test]
    fn rejects_other_extensions() {
        let f = write_file(".yaml", "ed: {}\n");
        let err = UserDirectory::load(f.path(), &model()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn admin_edits_round_trip_through_the_file() {
        let m = crate::config::ModelConfig::from_toml_str(
            &format!("{MODEL}\n[roles.curator.permissions]\nreview = [\"read\"]\n[roles.depositor.permissions]\ndeposit = [\"create\"]\n"),
        )
        .unwrap()
        .into_model("model.toml")
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.toml");

        let mut users = UserDirectory::default();
        users
            .add_user(
                User {
                    user_id: "jane@example.edu".into(),
                    display_name: "Jane".into(),
                    create_queue: Some("deposit".into()),
                    member_of: vec!["depositor".into()],
                },
                &m,
            )
            .unwrap();
        users.add_role("jane@example.edu", "curator", &m).unwrap();
        users.save(&path).unwrap();

        let mut reloaded = UserDirectory::load(&path, &m).unwrap();
        let jane = reloaded.get("jane@example.edu").unwrap();
        assert_eq!(jane.member_of, vec!["depositor", "curator"]);
        assert_eq!(jane.create_queue.as_deref(), Some("deposit"));

        reloaded.remove_role("jane@example.edu", "depositor").unwrap();
        let removed = reloaded.remove_user("jane@example.edu").unwrap();
        assert_eq!(removed.member_of, vec!["curator"]);
        assert!(reloaded.is_empty());
    }

    #[test]
    fn admin_edits_refuse_bad_changes() {
        let m = crate::config::ModelConfig::from_toml_str(
            &format!("{MODEL}\n[roles.curator.permissions]\nreview = [\"read\"]\n"),
        )
        .unwrap()
        .into_model("model.toml")
        .unwrap();
        let mut users = UserDirectory::from_users(vec![User {
            user_id: "ed".into(),
            display_name: String::new(),
            create_queue: None,
            member_of: vec!["curator".into()],
        }]);
        let user = |id: &str, queue: Option<&str>, roles: &[&str]| User {
            user_id: id.into(),
            display_name: String::new(),
            create_queue: queue.map(Into::into),
            member_of: roles.iter().map(|r| r.to_string()).collect(),
        };

        assert_eq!(
            users.add_user(user("ed", None, &[]), &m),
            Err(UserAdminError::DuplicateUser("ed".into()))
        );
        assert_eq!(
            users.add_user(user(" ", None, &[]), &m),
            Err(UserAdminError::BlankUserId)
        );
        assert_eq!(
            users.add_user(user("al", Some("deleted"), &[]), &m),
            Err(UserAdminError::UnusableCreateQueue("deleted".into()))
        );
        assert_eq!(
            users.add_user(user("al", None, &["janitor"]), &m),
            Err(UserAdminError::UnknownRole("janitor".into()))
        );
        assert!(matches!(
            users.add_role("ed", "curator", &m),
            Err(UserAdminError::AlreadyMember { .. })
        ));
        assert!(matches!(
            users.remove_role("ed", "janitor"),
            Err(UserAdminError::NotAMember { .. })
        ));
        assert_eq!(
            users.remove_user("nobody"),
            Err(UserAdminError::UnknownUser("nobody".into()))
        );
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn user_renders_as_keyed_toml_table() {
        let user = User {
            user_id: "jane.doe@example.edu".into(),
            display_name: "Jane Doe".into(),
            create_queue: None,
            member_of: vec!["author".into()],
        };
        let rendered = user.to_toml().unwrap();
        assert!(rendered.contains("[\"jane.doe@example.edu\"]"), "{rendered}");
        assert!(rendered.contains("display_name = \"Jane Doe\""), "{rendered}");
        assert!(!rendered.contains("create_queue"), "{rendered}");
    }

    #[test]
    fn user_serializes_with_user_id() {
        let user = User {
            user_id: "ed".into(),
            display_name: "Ed".into(),
            create_queue: None,
            member_of: vec!["editor".into()],
        };
        let v = serde_json::to_value(&user).unwrap();
        assert_eq!(v["user_id"], "ed");
        assert!(v.get("create_queue").is_none());
    }
}
