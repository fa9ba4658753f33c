use roxmltree::Node;

/// Value bound by a FOR clause.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Bound<'a, 'input> {
    Node(Node<'a, 'input>),
    /// 1-based position from `AT`
    Position(usize),
}

/// Scoped FOR-variable bindings; inner loops push on top of outer ones and
/// pop on exit, so lookups always see the innermost binding of a name.
#[derive(Debug, Default)]
pub(crate) struct Bindings<'a, 'input> {
    stack: Vec<(String, Bound<'a, 'input>)>,
}

impl<'a, 'input> Bindings<'a, 'input> {
    pub fn push(&mut self, name: &str, value: Bound<'a, 'input>) {
        self.stack.push((name.to_string(), value));
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    fn lookup(&self, name: &str) -> Option<Bound<'a, 'input>> {
        self.stack
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn node(&self, name: &str) -> Option<Node<'a, 'input>> {
        match self.lookup(name)? {
            Bound::Node(node) => Some(node),
            Bound::Position(_) => None,
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        match self.lookup(name)? {
            Bound::Position(pos) => Some(pos),
            Bound::Node(_) => None,
        }
    }

    /// Node bound by the innermost FOR clause.
    pub fn innermost_node(&self) -> Option<Node<'a, 'input>> {
        self.stack.iter().rev().find_map(|(_, v)| match v {
            Bound::Node(node) => Some(*node),
            Bound::Position(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inner_binding_shadows_outer() {
        let doc = roxmltree::Document::parse("<a><b/></a>").unwrap();
        let a = doc.root_element();
        let b = a.first_element_child().unwrap();

        let mut bindings = Bindings::default();
        bindings.push("x", Bound::Node(a));
        bindings.push("i", Bound::Position(1));
        bindings.push("x", Bound::Node(b));
        assert_eq!(bindings.node("x"), Some(b));
        assert_eq!(bindings.position("i"), Some(1));
        assert_eq!(bindings.innermost_node(), Some(b));

        bindings.pop();
        assert_eq!(bindings.node("x"), Some(a));
        assert_eq!(bindings.position("x"), None);
    }
}
