/// Common surface of every event that crosses the push boundary.
pub trait DomainEvent: Send + Sync + Clone {
    fn event_type(&self) -> &'static str;

    /// The entity the event is about, if it targets one.
    fn entity_id(&self) -> Option<&str>;
}
