//! Runtime helpers appended to converted code.
//!
//! Some CoffeeScript operators have no single JavaScript counterpart. The
//! main stage calls a small helper function instead and registers it here;
//! each registered helper is emitted once, after the converted program, in
//! registration order.

/// A runtime helper function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    /// `__guard__(value, transform)`: soaked access on any value.
    Guard,
    /// `__guardMethod__(obj, name, transform)`: soaked method call.
    GuardMethod,
    /// `__guardFunc__(func, transform)`: soaked call of a plain value.
    GuardFunc,
    /// `__range__(left, right, inclusive)`: range with runtime bounds.
    Range,
    /// `__mod__(a, b)`: `%%`, modulo with the sign of the divisor.
    Mod,
    /// `__in__(needle, haystack)`: `in` without `Array.prototype.includes`.
    In,
}

impl Helper {
    pub fn name(self) -> &'static str {
        match self {
            Helper::Guard => "__guard__",
            Helper::GuardMethod => "__guardMethod__",
            Helper::GuardFunc => "__guardFunc__",
            Helper::Range => "__range__",
            Helper::Mod => "__mod__",
            Helper::In => "__in__",
        }
    }

    /// JavaScript source of the helper, ending with a newline.
    pub fn source(self) -> &'static str {
        match self {
            Helper::Guard => {
                "function __guard__(value, transform) {
  return (typeof value !== 'undefined' && value !== null) ? transform(value) : undefined;
}
"
            }
            Helper::GuardMethod => {
                "function __guardMethod__(obj, methodName, transform) {
  if (typeof obj !== 'undefined' && obj !== null && typeof obj[methodName] === 'function') {
    return transform(obj, methodName);
  } else {
    return undefined;
  }
}
"
            }
            Helper::GuardFunc => {
                "function __guardFunc__(func, transform) {
  return typeof func === 'function' ? transform(func) : undefined;
}
"
            }
            Helper::Range => {
                "function __range__(left, right, inclusive) {
  let range = [];
  let ascending = left < right;
  let end = !inclusive ? right : ascending ? right + 1 : right - 1;
  for (let i = left; ascending ? i < end : i > end; ascending ? i++ : i--) {
    range.push(i);
  }
  return range;
}
"
            }
            Helper::Mod => {
                "function __mod__(a, b) {
  a = +a;
  b = +b;
  return (a % b + b) % b;
}
"
            }
            Helper::In => {
                "function __in__(needle, haystack) {
  return Array.from(haystack).indexOf(needle) >= 0;
}
"
            }
        }
    }
}

/// Helpers used by one conversion.
#[derive(Debug, Clone, Default)]
pub struct HelperRegistry {
    order: Vec<Helper>,
}

impl HelperRegistry {
    /// Register `helper` and return the name to call it by.
    pub fn register(&mut self, helper: Helper) -> &'static str {
        if !self.order.contains(&helper) {
            tracing::debug!(helper = helper.name(), "registered helper");
            self.order.push(helper);
        }
        helper.name()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.iter().map(|h| h.name().to_string()).collect()
    }

    /// Source of every registered helper, in registration order.
    pub fn render(&self) -> String {
        self.order.iter().map(|h| h.source()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helpers_register_once_in_order() {
        let mut registry = HelperRegistry::default();
        assert_eq!(registry.register(Helper::Mod), "__mod__");
        registry.register(Helper::Guard);
        registry.register(Helper::Mod);
        assert_eq!(registry.names(), vec!["__mod__", "__guard__"]);
    }

    #[test]
    fn render_concatenates_sources() {
        let mut registry = HelperRegistry::default();
        registry.register(Helper::GuardFunc);
        registry.register(Helper::In);
        let rendered = registry.render();
        assert!(rendered.starts_with("function __guardFunc__(func, transform) {\n"));
        assert!(rendered.ends_with("indexOf(needle) >= 0;\n}\n"));
    }

    #[test]
    fn every_helper_source_defines_its_name() {
        for helper in [
            Helper::Guard,
            Helper::GuardMethod,
            Helper::GuardFunc,
            Helper::Range,
            Helper::Mod,
            Helper::In,
        ] {
            assert!(helper
                .source()
                .starts_with(&format!("function {}(", helper.name())));
        }
    }
}
