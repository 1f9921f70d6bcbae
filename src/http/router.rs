//! Regex based route parser. Routes are registered with either a
//! constant constructor or a constructor taking captured path params.

use regex::Regex;

type ParamsConverter<R> = Box<Fn(Vec<&str>) -> Option<R>>;

pub struct RouteParser<R> {
    routes: Vec<(Regex, ParamsConverter<R>)>,
}

impl<R> Default for RouteParser<R> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<R> RouteParser<R> {
    /// Adds a route without params, e.g. `^/merchants$`
    pub fn add_route<F>(&mut self, pattern: &str, f: F)
    where
        F: Fn() -> R + 'static,
    {
        let regex = Regex::new(pattern).expect("Invalid route pattern");
        self.routes.push((regex, Box::new(move |_| Some(f()))));
    }

    /// Adds a route with params captured by the pattern's groups,
    /// e.g. `^/merchants/(merch_[0-9a-f]+)$`
    pub fn add_route_with_params<F>(&mut self, pattern: &str, f: F)
    where
        F: Fn(Vec<&str>) -> Option<R> + 'static,
    {
        let regex = Regex::new(pattern).expect("Invalid route pattern");
        self.routes.push((regex, Box::new(f)));
    }

    /// Tests a path against registered routes, first match wins
    pub fn test(&self, path: &str) -> Option<R> {
        self.routes.iter().filter_map(|&(ref regex, ref converter)| {
            regex.captures(path).and_then(|captures| {
                let params = captures
                    .iter()
                    .skip(1)
                    .filter_map(|capture| capture.map(|c| c.as_str()))
                    .collect::<Vec<_>>();
                converter(params)
            })
        }).next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum TestRoute {
        Items,
        Item { id: i32 },
    }

    fn create_parser() -> RouteParser<TestRoute> {
        let mut parser = RouteParser::default();
        parser.add_route(r"^/items$", || TestRoute::Items);
        parser.add_route_with_params(r"^/items/(\d+)$", |params| {
            params.get(0).and_then(|string_id| string_id.parse().ok()).map(|id| TestRoute::Item { id })
        });
        parser
    }

    #[test]
    fn matches_constant_route() {
        let parser = create_parser();
        assert_eq!(parser.test("/items"), Some(TestRoute::Items));
    }

    #[test]
    fn matches_route_with_params() {
        let parser = create_parser();
        assert_eq!(parser.test("/items/42"), Some(TestRoute::Item { id: 42 }));
    }

    #[test]
    fn rejects_unknown_route() {
        let parser = create_parser();
        assert_eq!(parser.test("/unknown"), None);
        assert_eq!(parser.test("/items/abc"), None);
    }
}
