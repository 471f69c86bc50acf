//! Rule matching: which rule (if any) governs a concrete request.

use crate::rule::{HttpMethod, Rule};

fn is_placeholder(segment: &str, name: &str) -> bool {
    segment == name
        || segment.strip_prefix(':') == Some(name)
        || segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            == Some(name)
}

/// Render the rule's route template with the request's parameter values.
///
/// Every parameter the rule declares and the request supplies is substituted
/// segment by segment. Without parameters the template is returned verbatim.
pub fn concrete_route<K, V>(rule: &Rule, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return rule.route.clone();
    }

    let declared = rule.declared_parameters();
    rule.route
        .split('/')
        .map(|segment| {
            declared
                .iter()
                .filter(|name| is_placeholder(segment, name))
                .find_map(|name| {
                    params
                        .iter()
                        .find(|(key, _)| key.as_ref() == name.as_str())
                        .map(|(_, value)| value.as_ref())
                })
                .unwrap_or(segment)
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Find the first rule (in rule-set order) governing `method` + `path`.
pub fn match_rule<'a, K, V>(
    rules: &'a [Rule],
    method: HttpMethod,
    path: &str,
    params: &[(K, V)],
) -> Option<&'a Rule>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    rules
        .iter()
        .filter(|rule| rule.method == method)
        .find(|rule| concrete_route(rule, params) == path)
}
