use crate::collaborators::TypeKind;
use serde::Deserialize;

/// Which trait implementations make a type a request, resource or response.
///
/// Matching is by the last path segment of the implemented trait, so
/// `impl app::http::FormRequest for StoreUser` and `impl FormRequest for
/// StoreUser` are equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Conventions {
    pub request: Vec<String>,
    pub resource: Vec<String>,
    pub collection: Vec<String>,
    pub raw_response: Vec<String>,
    pub redirect: Vec<String>,
    /// Type names that are redirects whether or not they implement anything
    pub redirect_types: Vec<String>,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            request: strings(&["FormRequest", "DocumentableRequest"]),
            resource: strings(&["JsonResource", "Resource"]),
            collection: strings(&["ResourceCollection"]),
            raw_response: strings(&["JsonResponse"]),
            redirect: strings(&["RedirectResponse"]),
            redirect_types: strings(&["Redirect", "RedirectResponse"]),
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl Conventions {
    /// The kind conferred by implementing `trait_name`
    pub fn kind_for_trait(&self, trait_name: &str) -> Option<TypeKind> {
        let table = [
            (&self.request, TypeKind::Request),
            (&self.resource, TypeKind::Resource),
            (&self.collection, TypeKind::ResourceCollection),
            (&self.raw_response, TypeKind::RawResponse),
            (&self.redirect, TypeKind::Redirect),
        ];
        table
            .into_iter()
            .find(|(names, _)| names.iter().any(|name| name == trait_name))
            .map(|(_, kind)| kind)
    }

    pub fn is_redirect_type(&self, type_name: &str) -> bool {
        self.redirect_types.iter().any(|name| name == type_name)
    }
}
