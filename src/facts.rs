use crate::event::EventHandler;
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;

/// The attribute name whose values compose instead of overriding each other.
const CLASS_ATTRIBUTE: &str = "class";
/// The property name with the same composition rule.
const CLASS_PROPERTY: &str = "className";

/// A property value at the host boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
	String(Rc<str>),
	Bool(bool),
	Number(f64),
}
impl PropertyValue {
	pub fn string(value: impl AsRef<str>) -> Self {
		PropertyValue::String(value.as_ref().into())
	}
}

/// One attribute directive, as written at a node's construction site.
///
/// Directives are ordered; [`organize_facts`] resolves repeats.
#[derive(Clone, Debug)]
pub enum Directive {
	Attribute(Rc<str>, Rc<str>),
	AttributeNs(Rc<str>, Rc<str>, Rc<str>),
	Property(Rc<str>, PropertyValue),
	Style(Rc<str>, Rc<str>),
	Event(Rc<str>, EventHandler),
}
impl Directive {
	pub fn attribute(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
		Directive::Attribute(name.as_ref().into(), value.as_ref().into())
	}

	pub fn attribute_ns(namespace: impl AsRef<str>, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
		Directive::AttributeNs(namespace.as_ref().into(), name.as_ref().into(), value.as_ref().into())
	}

	pub fn property(name: impl AsRef<str>, value: PropertyValue) -> Self {
		Directive::Property(name.as_ref().into(), value)
	}

	pub fn style(name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
		Directive::Style(name.as_ref().into(), value.as_ref().into())
	}

	pub fn on(event: impl AsRef<str>, handler: EventHandler) -> Self {
		Directive::Event(event.as_ref().into(), handler)
	}
}

/// A node's categorized attribute record.
#[derive(Clone, Default)]
pub struct Facts {
	pub events: HashMap<Rc<str>, EventHandler>,
	pub styles: HashMap<Rc<str>, Rc<str>>,
	pub properties: HashMap<Rc<str>, PropertyValue>,
	pub attributes: HashMap<Rc<str>, Rc<str>>,
	/// name → (namespace, value)
	pub namespaced: HashMap<Rc<str>, (Rc<str>, Rc<str>)>,
}
impl Facts {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.styles.is_empty() && self.properties.is_empty() && self.attributes.is_empty() && self.namespaced.is_empty()
	}
}
impl fmt::Debug for Facts {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Facts")
			.field("events", &self.events.len())
			.field("styles", &self.styles)
			.field("properties", &self.properties)
			.field("attributes", &self.attributes)
			.field("namespaced", &self.namespaced)
			.finish()
	}
}

/// Folds an ordered directive list into categorized buckets.
///
/// Later directives win for a repeated (category, name) pair, except that
/// `class` attribute and `className` property values are space-joined so CSS
/// classes can be composed from multiple sources.
#[must_use]
pub fn organize_facts(directives: impl IntoIterator<Item = Directive>) -> Facts {
	let mut facts = Facts::default();
	for directive in directives {
		match directive {
			Directive::Attribute(name, value) => {
				let value = if &*name == CLASS_ATTRIBUTE {
					join_classes(facts.attributes.get(&name), &value)
				} else {
					value
				};
				facts.attributes.insert(name, value);
			}
			Directive::AttributeNs(namespace, name, value) => {
				facts.namespaced.insert(name, (namespace, value));
			}
			Directive::Property(name, value) => {
				let value = match (&*name == CLASS_PROPERTY, facts.properties.get(&name), &value) {
					(true, Some(PropertyValue::String(prior)), PropertyValue::String(next)) => PropertyValue::String(join_classes(Some(prior), next)),
					_ => value,
				};
				facts.properties.insert(name, value);
			}
			Directive::Style(name, value) => {
				facts.styles.insert(name, value);
			}
			Directive::Event(name, handler) => {
				facts.events.insert(name, handler);
			}
		}
	}
	facts
}

fn join_classes(prior: Option<&Rc<str>>, value: &Rc<str>) -> Rc<str> {
	match prior {
		Some(prior) => format!("{} {}", prior, value).into(),
		None => value.clone(),
	}
}

/// The changed slots between two [`Facts`] records, per category.
///
/// A `None` value means "remove"; for namespaced attributes the namespace is
/// kept alongside so removal can name it.
#[derive(Clone, Debug, Default)]
pub struct FactsDelta {
	pub events: HashMap<Rc<str>, Option<EventHandler>>,
	pub styles: HashMap<Rc<str>, Option<Rc<str>>>,
	pub properties: HashMap<Rc<str>, Option<PropertyValue>>,
	pub attributes: HashMap<Rc<str>, Option<Rc<str>>>,
	pub namespaced: HashMap<Rc<str>, (Rc<str>, Option<Rc<str>>)>,
}
impl FactsDelta {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.styles.is_empty() && self.properties.is_empty() && self.attributes.is_empty() && self.namespaced.is_empty()
	}

	/// Every fact of `facts` as an insertion; the initial-render delta.
	#[must_use]
	pub fn from_full(facts: &Facts) -> Self {
		FactsDelta {
			events: facts.events.iter().map(|(k, v)| (k.clone(), Some(v.clone()))).collect(),
			styles: facts.styles.iter().map(|(k, v)| (k.clone(), Some(v.clone()))).collect(),
			properties: facts.properties.iter().map(|(k, v)| (k.clone(), Some(v.clone()))).collect(),
			attributes: facts.attributes.iter().map(|(k, v)| (k.clone(), Some(v.clone()))).collect(),
			namespaced: facts.namespaced.iter().map(|(k, (ns, v))| (k.clone(), (ns.clone(), Some(v.clone())))).collect(),
		}
	}
}

/// Diffs two fact records category by category.
///
/// Returns `None` when nothing changed, so the caller emits no patch at all
/// for untouched nodes.
#[must_use]
pub fn diff_facts(old: &Facts, new: &Facts) -> Option<FactsDelta> {
	let delta = FactsDelta {
		events: diff_category(&old.events, &new.events),
		styles: diff_category(&old.styles, &new.styles),
		properties: diff_category(&old.properties, &new.properties),
		attributes: diff_category(&old.attributes, &new.attributes),
		namespaced: diff_namespaced(&old.namespaced, &new.namespaced),
	};
	if delta.is_empty() {
		None
	} else {
		Some(delta)
	}
}

fn diff_category<V: Clone + PartialEq>(old: &HashMap<Rc<str>, V>, new: &HashMap<Rc<str>, V>) -> HashMap<Rc<str>, Option<V>> {
	let mut delta = HashMap::new();
	for (name, value) in old {
		match new.get(name) {
			None => {
				delta.insert(name.clone(), None);
			}
			Some(next) if next != value => {
				delta.insert(name.clone(), Some(next.clone()));
			}
			Some(_) => {}
		}
	}
	for (name, value) in new {
		if !old.contains_key(name) {
			delta.insert(name.clone(), Some(value.clone()));
		}
	}
	delta
}

fn diff_namespaced(old: &HashMap<Rc<str>, (Rc<str>, Rc<str>)>, new: &HashMap<Rc<str>, (Rc<str>, Rc<str>)>) -> HashMap<Rc<str>, (Rc<str>, Option<Rc<str>>)> {
	let mut delta = HashMap::new();
	for (name, (namespace, value)) in old {
		match new.get(name) {
			None => {
				delta.insert(name.clone(), (namespace.clone(), None));
			}
			Some((next_ns, next)) if next_ns != namespace || next != value => {
				delta.insert(name.clone(), (next_ns.clone(), Some(next.clone())));
			}
			Some(_) => {}
		}
	}
	for (name, (namespace, value)) in new {
		if !old.contains_key(name) {
			delta.insert(name.clone(), (namespace.clone(), Some(value.clone())));
		}
	}
	delta
}
