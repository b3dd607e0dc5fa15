use std::path::Path;
use std::process;

use andor_core::{AccessModel, User, UserDirectory};

use crate::{report_error, OutputFormat, UserAction};

fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

/// List or edit the users file. Every edit is checked against the model
/// before the file is rewritten.
pub(crate) fn cmd_users(
    model_path: &Path,
    users_path: &Path,
    action: UserAction,
    output: OutputFormat,
    quiet: bool,
) {
    let model = AccessModel::load(model_path)
        .unwrap_or_else(|e| fail(&e.to_string(), output, quiet));
    let mut users = if matches!(action, UserAction::Add { .. }) && !users_path.exists() {
        UserDirectory::default()
    } else {
        UserDirectory::load(users_path, &model)
            .unwrap_or_else(|e| fail(&e.to_string(), output, quiet))
    };

    let (message, record) = match action {
        UserAction::List => {
            print_users(&users, output, quiet);
            return;
        }
        UserAction::Add {
            user_id,
            display_name,
            create_queue,
            roles,
        } => {
            let user = User {
                user_id: user_id.clone(),
                display_name,
                create_queue,
                member_of: roles,
            };
            let added = users
                .add_user(user, &model)
                .map(|()| format!("added user '{}'", user_id));
            (added, users.get(&user_id).cloned())
        }
        UserAction::Remove { user_id } => {
            let removed = users
                .remove_user(&user_id)
                .map(|_| format!("removed user '{}'", user_id));
            (removed, None)
        }
        UserAction::AddRole { user_id, role } => {
            let added = users
                .add_role(&user_id, &role, &model)
                .map(|()| format!("'{}' is now a member of '{}'", user_id, role));
            (added, users.get(&user_id).cloned())
        }
        UserAction::RemoveRole { user_id, role } => {
            let removed = users
                .remove_role(&user_id, &role)
                .map(|()| format!("'{}' is no longer a member of '{}'", user_id, role));
            (removed, users.get(&user_id).cloned())
        }
    };
    let message = message.unwrap_or_else(|e| fail(&e.to_string(), output, quiet));
    if let Err(e) = users.save(users_path) {
        fail(&e.to_string(), output, quiet);
    }

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let response = serde_json::json!({ "message": message, "user": record });
            let json = serde_json::to_string_pretty(&response)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => println!("{}", message),
    }
}

fn print_users(users: &UserDirectory, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let all: Vec<&User> = users.users().collect();
            let json = serde_json::to_string_pretty(&all)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            for user in users.users() {
                match user.to_toml() {
                    Ok(table) => println!("{}", table),
                    Err(e) => {
                        let msg = format!("could not render '{}': {}", user.user_id, e);
                        fail(&msg, output, quiet)
                    }
                }
            }
        }
    }
}
