use crate::domain::errors::{Forbidden as Denied, NotFound};
use crate::http::resources::{UserCollection, UserResource};

pub struct UserController;

impl UserController {
    /// List users.
    ///
    /// Every registered user, newest first.
    pub fn index(&self, query: Query<SearchUsers>) -> UserCollection {
        UserCollection::new(self.repository.latest())
    }

    /// Show one user.
    ///
    /// @throws NotFound
    pub async fn show(&self, user: Path<u64>) -> Result<UserResource, AppError> {
        let user = self.repository.find(user.into_inner()).ok_or(NotFound)?;
        Ok(UserResource::new(user))
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// - `Denied` when the caller may not create users
    /// - `Teapot` never, but documented anyway
    pub fn store(&self, request: Valid<StoreUser>) -> UserResource {
        UserResource::new(self.repository.insert(request.into_inner()))
    }

    /// Remove a user.
    pub fn destroy(&self, user: Path<u64>) -> Redirect {
        self.repository.delete(user.into_inner());
        Redirect::to("/users")
    }
}
