use crate::{
	attrs::assign_props,
	document::{Created, Document, Lifecycle},
	fragment::{Fragment, Mounted},
	vnode::{Element, Vnode},
	DomDiffer, Error, Result, Value,
};
use tracing::{instrument, trace, trace_span};

impl<D: Document> DomDiffer<D> {
	/// Turns `vnode` into live nodes without attaching them anywhere.
	///
	/// Lists that aren't a single vnode become a [`Fragment`], which is empty but for a placeholder if the list is.
	///
	/// # Errors
	///
	/// [`Error::InvalidVnode`] if `vnode` is `null` or otherwise can't describe a tree,
	/// and errors raised by components or by the decorator's element hook.
	#[instrument(skip(self, vnode))]
	pub fn materialize(&self, vnode: &Value, svg: bool) -> Result<Mounted<D::Node>> {
		let vnode = Vnode::normalize(vnode)?;
		self.create(&vnode, svg)
	}

	/// Materializes `vnode` and appends the result to `target`.
	///
	/// # Errors
	///
	/// As [`DomDiffer::materialize`]. Nothing is attached in that case.
	#[instrument(skip(self, vnode))]
	pub fn mount(&self, target: &D::Node, vnode: &Value) -> Result<Mounted<D::Node>> {
		let mounted = self.materialize(vnode, false)?;
		for node in mounted.nodes() {
			self.document.append_child(target, &node);
		}
		Ok(mounted)
	}

	pub(crate) fn create(&self, vnode: &Vnode, svg: bool) -> Result<Mounted<D::Node>> {
		match vnode {
			Vnode::Fragment(items) => {
				let span = trace_span!("Creating fragment", "items.len()" = items.len());
				let _enter = span.enter();
				let mut nodes = Vec::with_capacity(items.len());
				for item in items {
					nodes.extend(self.create_node(item, svg)?);
				}
				Ok(Mounted::Fragment(Fragment::new(&self.document, nodes)))
			}
			vnode => self.create_node(vnode, svg)?.map(Mounted::Node).ok_or_else(|| Error::InvalidVnode(Value::Null.to_string())),
		}
	}

	/// [`None`] for [`Vnode::Empty`].
	pub(crate) fn create_node(&self, vnode: &Vnode, svg: bool) -> Result<Option<D::Node>> {
		match vnode {
			Vnode::Empty => Ok(None),
			Vnode::Text(text) => {
				let span = trace_span!("Creating text node");
				let _enter = span.enter();
				Ok(Some(self.document.create_text_node(text)))
			}
			Vnode::Element(element) => self.create_element(element, svg).map(Some),
			Vnode::Fragment(_) => Err(Error::InvalidVnode("a fragment nested inside a child list".to_owned())),
		}
	}

	fn create_element(&self, Element { tag, attrs, children }: &Element, svg: bool) -> Result<D::Node> {
		let span = trace_span!("Creating element", %tag);
		let _enter = span.enter();

		let svg = svg || tag == "svg";
		let mut element = self.document.create_element(tag, svg);

		if let Some(decorator) = &self.decorator {
			element = match decorator.element(&self.document, element, tag, attrs.as_ref(), children)? {
				Created::Node(element) => element,
				Created::Render(rendered) => {
					trace!("Element hook rendered a replacement.");
					return match self.create(&Vnode::normalize(&rendered)?, svg)? {
						Mounted::Node(node) => Ok(node),
						Mounted::Fragment(_) => Err(Error::InvalidVnode(format!("a fragment rendered by the element hook for <{}>", tag))),
					};
				}
			};
		}

		if let Some(attrs) = attrs.as_ref().filter(|attrs| !attrs.is_empty()) {
			assign_props(&self.document, &element, attrs, svg, self.decorator.as_deref());
		}

		self.fire(&element, Lifecycle::Create);
		self.fire(&element, Lifecycle::Enter);

		for child in children {
			if let Some(child) = self.create_node(child, svg)? {
				self.document.append_child(&element, &child);
			}
		}

		Ok(element)
	}
}
