use repository::{NewUser, Registration, UserRepository};

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::events::ChatUser;
use crate::reply::Reply;

impl Dispatcher {
    pub(crate) async fn start(&self, user: &ChatUser) -> Result<Vec<Reply>> {
        let registration = self
            .repo
            .register_user(NewUser {
                id: user.id,
                first_name: user.first_name.clone(),
                username: user.username.clone(),
            })
            .await?;

        if registration == Registration::Created {
            tracing::info!(
                user_id = %user.id,
                username = user.username.as_deref().unwrap_or("-"),
                "new user"
            );
        }

        Ok(vec![Reply::main_menu(
            "Hi! Press Catalog to browse our products",
        )])
    }
}
