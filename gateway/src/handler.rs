//! Typed event subscription and dispatch.
//!
//! Subscribers are stored per event name in registration order. Each
//! subscriber is backed by its own queue and consumer task: the reader only
//! enqueues, so a slow handler can never block it, while one subscriber
//! always observes its events in dispatch order. Registering a subscriber
//! for an event that requires intents folds those bits into the intents the
//! session will identify with.

use crate::error::RemoveHandlerError;
use accord_model::{
    application::Interaction,
    channel::{Channel, Message, TypingStart},
    gateway::{
        event::{Event, EventType},
        payload::incoming::Ready,
        Intents,
    },
    guild::{Guild, UnavailableGuild},
};
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};
use tokio::sync::mpsc::{self, UnboundedSender};

/// Handle of one registered subscriber, used for removal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HandlerId {
    kind: EventType,
    index: usize,
}

impl HandlerId {
    /// Event the subscriber was registered for.
    pub const fn kind(self) -> EventType {
        self.kind
    }

    /// Index of the subscriber in the event's list at registration time.
    pub const fn index(self) -> usize {
        self.index
    }
}

struct RegistryInner {
    handlers: HashMap<EventType, Vec<UnboundedSender<Event>>>,
    /// Event types whose intents were already folded in, so repeat
    /// registrations don't recompute.
    inferred: HashSet<EventType>,
    intents: Intents,
}

/// Registry mapping event names to ordered subscriber lists.
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed subscriber for its event, returning a handle for
    /// removal.
    ///
    /// The handler runs on its own task; events reach it in dispatch order.
    pub fn on<E, F>(&self, handler: F) -> HandlerId
    where
        E: FromEvent,
        F: Fn(E) + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(typed) = E::from_event(event) {
                    handler(typed);
                }
            }
        });

        let mut inner = self.inner.lock().expect("registry poisoned");

        if inner.inferred.insert(E::KIND) {
            inner.intents |= E::KIND.intents();
        }

        let list = inner.handlers.entry(E::KIND).or_default();
        list.push(tx);

        HandlerId {
            kind: E::KIND,
            index: list.len() - 1,
        }
    }

    /// Remove the subscriber at an index for an event.
    ///
    /// Subscribers before and after the index keep their order and the
    /// removed subscriber's task winds down once its queue drains. Inferred
    /// intents are not cleared by removal.
    pub fn remove(&self, kind: EventType, index: usize) -> Result<(), RemoveHandlerError> {
        let mut inner = self.inner.lock().expect("registry poisoned");
        let list = inner.handlers.entry(kind).or_default();

        if index >= list.len() {
            return Err(RemoveHandlerError {
                index,
                len: list.len(),
            });
        }

        list.remove(index);

        Ok(())
    }

    /// Intents inferred from the registered subscribers.
    pub fn intents(&self) -> Intents {
        self.inner.lock().expect("registry poisoned").intents
    }

    /// Number of subscribers currently registered for an event.
    pub fn len(&self, kind: EventType) -> usize {
        self.inner
            .lock()
            .expect("registry poisoned")
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Enqueue an event for every subscriber of its name.
    ///
    /// Never blocks: delivery is a channel send per subscriber.
    pub(crate) fn dispatch(&self, event: Event) {
        let inner = self.inner.lock().expect("registry poisoned");

        let Some(list) = inner.handlers.get(&event.kind()) else {
            return;
        };

        for subscriber in list {
            let _ = subscriber.send(event.clone());
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                handlers: HashMap::new(),
                inferred: HashSet::new(),
                intents: Intents::empty(),
            }),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("intents", &self.intents())
            .finish()
    }
}

/// A typed event payload extractable from a dispatched [`Event`].
pub trait FromEvent: Sized + Send + 'static {
    /// The event name this payload belongs to.
    const KIND: EventType;

    /// Extract the payload, or `None` if the event is of another kind.
    fn from_event(event: Event) -> Option<Self>;
}

/// Marker payload of the `RESUMED` event, which carries no data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Resumed;

macro_rules! from_event {
    ($(($name:ident, $kind:ident, $payload:ty, $pattern:pat => $extract:expr);)*) => {
        $(
            #[doc = concat!("Payload of the `", stringify!($kind), "` event.")]
            #[derive(Clone, Debug, PartialEq)]
            pub struct $name(pub $payload);

            impl FromEvent for $name {
                const KIND: EventType = EventType::$kind;

                fn from_event(event: Event) -> Option<Self> {
                    match event {
                        $pattern => Some(Self($extract)),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_event! {
    (ChannelCreate, ChannelCreate, Channel, Event::ChannelCreate(channel) => channel);
    (ChannelDelete, ChannelDelete, Channel, Event::ChannelDelete(channel) => channel);
    (GuildCreate, GuildCreate, Guild, Event::GuildCreate(guild) => *guild);
    (GuildDelete, GuildDelete, UnavailableGuild, Event::GuildDelete(guild) => guild);
    (InteractionCreate, InteractionCreate, Interaction, Event::InteractionCreate(interaction) => *interaction);
    (MessageCreate, MessageCreate, Message, Event::MessageCreate(message) => *message);
    (MessageDelete, MessageDelete, accord_model::channel::MessageDelete, Event::MessageDelete(message) => message);
    (MessageUpdate, MessageUpdate, Message, Event::MessageUpdate(message) => *message);
    (ReadyEvent, Ready, Ready, Event::Ready(ready) => *ready);
    (TypingStartEvent, TypingStart, TypingStart, Event::TypingStart(typing) => typing);
}

impl FromEvent for Resumed {
    const KIND: EventType = EventType::Resumed;

    fn from_event(event: Event) -> Option<Self> {
        matches!(event, Event::Resumed).then_some(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageCreate, Registry, Resumed};
    use accord_model::gateway::{event::EventType, Intents};

    #[tokio::test]
    async fn registering_infers_intents_once() {
        let registry = Registry::new();
        assert!(registry.intents().is_empty());

        registry.on::<MessageCreate, _>(|_| {});
        let inferred = registry.intents();
        assert!(inferred.contains(Intents::GUILD_MESSAGES));
        assert!(inferred.contains(Intents::DIRECT_MESSAGES));

        // Idempotent on repeat registration for the same event.
        registry.on::<MessageCreate, _>(|_| {});
        assert_eq!(inferred, registry.intents());
    }

    #[tokio::test]
    async fn removal_leaves_others_in_place() {
        let registry = Registry::new();

        registry.on::<Resumed, _>(|_| {});
        registry.on::<Resumed, _>(|_| {});
        registry.on::<Resumed, _>(|_| {});
        assert_eq!(3, registry.len(EventType::Resumed));

        registry.remove(EventType::Resumed, 1).unwrap();
        assert_eq!(2, registry.len(EventType::Resumed));

        // Out of range removal is a typed error and changes nothing.
        let err = registry.remove(EventType::Resumed, 5).unwrap_err();
        assert_eq!(5, err.index());
        assert_eq!(2, err.len());
        assert_eq!(2, registry.len(EventType::Resumed));

        // Removal never clears inferred intents.
        registry.remove(EventType::Resumed, 0).unwrap();
        registry.remove(EventType::Resumed, 0).unwrap();
        assert_eq!(Intents::empty(), registry.intents());
    }
}
