/// A DOM element as far as request dispatch cares: tag, attributes, and for
/// forms the successful controls in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    attributes: Vec<(String, String)>,
    fields: Vec<(String, String)>,
    form: Option<Box<Element>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn anchor(href: impl Into<String>) -> Self {
        Self::new("a").with_attribute("href", href)
    }

    pub fn form(method: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new("form")
            .with_attribute("method", method)
            .with_attribute("action", action)
    }

    /// A submit button; give it a form with [`within`](Self::within).
    pub fn button() -> Self {
        Self::new("button").with_attribute("type", "submit")
    }

    /// Set an attribute, replacing an existing one of the same name.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        match self.attributes.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Append a form control value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Place this element inside `form`.
    pub fn within(mut self, form: Element) -> Self {
        self.form = Some(Box::new(form));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn owning_form(&self) -> Option<&Element> {
        self.form.as_deref()
    }

    pub fn is_anchor(&self) -> bool {
        self.tag == "a"
    }

    pub fn is_form(&self) -> bool {
        self.tag == "form"
    }

    /// Buttons default to `type="submit"`; inputs submit only as submit/image.
    pub fn is_submitter(&self) -> bool {
        match self.tag.as_str() {
            "button" => self
                .attribute("type")
                .map_or(true, |kind| kind.eq_ignore_ascii_case("submit")),
            "input" => self
                .attribute("type")
                .is_some_and(|kind| kind.eq_ignore_ascii_case("submit") || kind.eq_ignore_ascii_case("image")),
            _ => false,
        }
    }

    /// `name` looked up on the element itself and on its owning form.
    pub fn configured(&self, name: &str) -> (Option<&str>, Option<&str>) {
        (
            self.attribute(name),
            self.owning_form().and_then(|form| form.attribute(name)),
        )
    }
}
