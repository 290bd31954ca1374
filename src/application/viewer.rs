use crate::domain::entities::{UserId, UserRecord};

/// Identity on whose behalf a request runs, as supplied by the authentication layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(UserRecord),
}

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|user| user.id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::User(_))
    }
}

impl From<Option<UserRecord>> for Viewer {
    fn from(user: Option<UserRecord>) -> Self {
        user.map_or(Viewer::Anonymous, Viewer::User)
    }
}
