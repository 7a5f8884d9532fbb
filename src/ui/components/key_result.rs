/// Outcome of offering a key to a component.
///
/// Components either swallow the key, swallow it and report an event for the
/// owning view, or decline it so the view can try its own bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed
  NotHandled,
}
