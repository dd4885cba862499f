use crate::domain::User;

/// A registered user.
pub struct UserResource {
    user: User,
}

impl JsonResource for UserResource {}

impl UserResource {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

pub struct UserCollection {
    users: Vec<User>,
}

impl ResourceCollection for UserCollection {}

pub struct StoreUser;

impl FormRequest for StoreUser {}

pub struct SearchUsers;

impl FormRequest for SearchUsers {}
