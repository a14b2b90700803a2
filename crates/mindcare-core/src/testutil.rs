//! Shared fixtures for unit tests: a temp store with one institution.

use crate::config::Config;
use crate::counsellor::Counsellor;
use crate::institution::Institution;
use crate::policy::Actor;
use crate::store::Store;
use crate::types::Role;
use crate::user::User;
use tempfile::TempDir;

pub struct Fixture {
    pub _dir: TempDir,
    pub store: Store,
    pub config: Config,
    pub institution: Institution,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("test.redb")).unwrap();
        let institution = Institution::new("Uni", "uni.edu", vec!["en".into()]);
        store.write(|tx| tx.put_institution(&institution)).unwrap();
        Self {
            _dir: dir,
            store,
            config: Config::new("test"),
            institution,
        }
    }

    fn put(&self, role: Option<Role>, email: &str) -> User {
        let name = email.split('@').next().map(str::to_string);
        let mut user = User::new(name, Some(email.into()));
        user.role = role;
        user.institution_id = Some(self.institution.id);
        self.store.write(|tx| tx.put_user(&user)).unwrap();
        user
    }

    pub fn user(&self, role: Role, email: &str) -> Actor {
        Actor::from(&self.put(Some(role), email))
    }

    /// A user who has never been assigned a role.
    pub fn newcomer(&self, email: &str) -> Actor {
        Actor::from(&self.put(None, email))
    }

    pub fn counsellor(&self, email: &str) -> (Actor, Counsellor) {
        let user = self.put(Some(Role::Counsellor), email);
        let profile = Counsellor::new(user.id, self.institution.id);
        self.store.write(|tx| tx.put_counsellor(&profile)).unwrap();
        (Actor::from(&user), profile)
    }
}
