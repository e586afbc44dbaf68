//! Package cart persisted client-side under a fixed key, with change
//! notifications so multiple views (tabs) of the cart stay in sync.

use tokio::sync::watch;

/// Storage key for the serialized cart. Fixed so every tab reads and writes
/// the same entry.
pub const CART_STORAGE_KEY: &str = "lumiere-cart";

/// Insertion-ordered set of package ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    ids: Vec<String>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = String>) -> Self {
        let mut cart = Self::new();
        for id in ids {
            cart.add(id);
        }
        cart
    }

    /// Adds an id; a duplicate keeps its original position.
    pub fn add(&mut self, id: String) -> bool {
        if self.ids.contains(&id) {
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        match self.ids.iter().position(|existing| existing == id) {
            Some(pos) => {
                self.ids.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// Shared cart with change notification. Observers hold a receiver and see
/// every committed mutation, the analog of same-origin storage events.
pub struct CartStore {
    tx: watch::Sender<Cart>,
}

impl CartStore {
    pub fn new(initial: Cart) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Cart {
        self.tx.borrow().clone()
    }

    pub fn add(&self, id: String) {
        self.tx.send_if_modified(|cart| cart.add(id));
    }

    pub fn remove(&self, id: &str) {
        self.tx.send_if_modified(|cart| cart.remove(id));
    }

    pub fn clear(&self) {
        self.tx.send_if_modified(|cart| {
            if cart.is_empty() {
                false
            } else {
                cart.clear();
                true
            }
        });
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(Cart::new())
    }
}
