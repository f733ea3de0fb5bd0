use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Mutex,
};

use taged_storage::{BoxFuture, Result, models::User, tags::TagStore};

#[derive(Default)]
struct State {
	users: BTreeMap<String, User>,
	/// Tag name to the usernames it is granted to.
	tags: BTreeMap<String, BTreeSet<String>>,
}

/// In-memory `TagStore` with the same create-once semantics as the Postgres store.
#[derive(Default)]
pub struct MemoryTagStore {
	state: Mutex<State>,
}
impl MemoryTagStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_user(self, user: User) -> Self {
		self.add_user(user);

		self
	}

	pub fn add_user(&self, user: User) {
		self.lock().users.insert(user.username.clone(), user);
	}

	pub fn add_tag(&self, name: &str, owners: &[&str]) {
		let mut state = self.lock();
		let granted = state.tags.entry(name.to_string()).or_default();

		granted.extend(owners.iter().map(|owner| owner.to_string()));
	}

	pub fn tag_names(&self) -> Vec<String> {
		self.lock().tags.keys().cloned().collect()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}
impl TagStore for MemoryTagStore {
	fn find_user<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Option<User>>> {
		let user = self.lock().users.get(username).cloned();

		Box::pin(async move { Ok(user) })
	}

	fn all_tags<'a>(&'a self) -> BoxFuture<'a, Result<Vec<String>>> {
		let names = self.tag_names();

		Box::pin(async move { Ok(names) })
	}

	fn user_tags<'a>(&'a self, username: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
		let names = self
			.lock()
			.tags
			.iter()
			.filter(|(_, owners)| owners.contains(username))
			.map(|(name, _)| name.clone())
			.collect::<Vec<_>>();

		Box::pin(async move { Ok(names) })
	}

	fn ensure_tag<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
		let mut state = self.lock();
		let created = !state.tags.contains_key(name);

		if created {
			state.tags.insert(name.to_string(), BTreeSet::new());
		}

		drop(state);

		Box::pin(async move { Ok(created) })
	}

	fn grant_tag<'a>(&'a self, name: &'a str, username: &'a str) -> BoxFuture<'a, Result<()>> {
		self.add_tag(name, &[username]);

		Box::pin(async { Ok(()) })
	}
}
