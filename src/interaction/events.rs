use crate::bus::BusEvent;
use crate::interaction::Element;
use crate::request::SharedOptions;

#[derive(Debug)]
pub enum InteractionEvent {
    /// An element is about to trigger a request. Cancelable; listeners copy
    /// element attributes into the options.
    Interaction(InteractionDetail),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionEventKind {
    Interaction,
}

impl BusEvent for InteractionEvent {
    type Kind = InteractionEventKind;

    fn kind(&self) -> InteractionEventKind {
        InteractionEventKind::Interaction
    }
}

#[derive(Debug)]
pub struct InteractionDetail {
    /// The element interacted with: the anchor, the form, or the submitter.
    pub element: Element,
    pub options: SharedOptions,
}
