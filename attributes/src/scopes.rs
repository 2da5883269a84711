use idp::models::OidcScope;

use crate::reconciler::SelectedExternalClaim;

/// Scope that is always requested from an OIDC provider.
pub const OPENID_SCOPE: &str = "openid";

/// External claims released through one OIDC scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeGroup {
    /// Empty for the group of claims no declared scope releases.
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub claims: Vec<SelectedExternalClaim>,
    /// True iff any of the claims is requested.
    pub selected: bool,
}

impl ScopeGroup {
    fn new(
        name: &str,
        display_name: &str,
        description: Option<String>,
        claims: Vec<SelectedExternalClaim>,
    ) -> Self {
        let selected = claims.iter().any(|c| c.requested);
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description,
            claims,
            selected,
        }
    }
}

/// Partitions external claims into the scopes that release them.
///
/// Claims are matched to scopes by external claim URI and may appear in
/// several groups. Claims no scope releases end up in one group with an
/// empty name. Groups without claims are dropped.
pub fn group_by_scopes(claims: &[SelectedExternalClaim], scopes: &[OidcScope]) -> Vec<ScopeGroup> {
    let mut groups: Vec<ScopeGroup> = scopes
        .iter()
        .filter_map(|scope| {
            let members: Vec<_> = claims
                .iter()
                .filter(|c| scope.claims.contains(&c.claim.claim_uri))
                .cloned()
                .collect();
            if members.is_empty() {
                return None;
            }
            let display_name = if scope.display_name.is_empty() {
                &scope.name
            } else {
                &scope.display_name
            };
            Some(ScopeGroup::new(
                &scope.name,
                display_name,
                scope.description.clone(),
                members,
            ))
        })
        .collect();

    let scopeless: Vec<_> = claims
        .iter()
        .filter(|c| !scopes.iter().any(|s| s.claims.contains(&c.claim.claim_uri)))
        .cloned()
        .collect();
    if !scopeless.is_empty() {
        groups.push(ScopeGroup::new("", "", None, scopeless));
    }

    groups.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    groups
}

/// Result of a scope search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeFilter {
    pub groups: Vec<ScopeGroup>,
    /// Names of the scopes that only matched through one of their claims.
    pub expanded: Vec<String>,
}

/// Case-insensitive search over scopes and the claims they release.
///
/// A scope matching by name, display name or description is kept whole. A
/// scope matching only through its claims keeps just those claims and is
/// reported as expanded.
pub fn filter_scope_groups(groups: &[ScopeGroup], query: &str) -> ScopeFilter {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return ScopeFilter {
            groups: groups.to_vec(),
            expanded: Vec::new(),
        };
    }
    let matches = |value: &str| value.to_lowercase().contains(&query);

    let mut filter = ScopeFilter::default();
    for group in groups {
        let scope_match = matches(&group.name)
            || matches(&group.display_name)
            || group.description.as_deref().is_some_and(matches);
        if scope_match {
            filter.groups.push(group.clone());
            continue;
        }

        let claims: Vec<_> = group
            .claims
            .iter()
            .filter(|c| {
                matches(&c.claim.claim_uri)
                    || matches(&c.claim.claim_dialect_uri)
                    || matches(&c.claim.mapped_local_claim_uri)
                    || c.claim.local_claim_display_name.as_deref().is_some_and(matches)
            })
            .cloned()
            .collect();
        if !claims.is_empty() {
            filter.expanded.push(group.name.clone());
            filter.groups.push(ScopeGroup {
                claims,
                ..group.clone()
            });
        }
    }

    filter.groups.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    filter
}

/// Scopes an application has to request to receive its selected claims.
pub fn selected_scope_names(groups: &[ScopeGroup]) -> Vec<String> {
    let mut names = vec![OPENID_SCOPE.to_string()];
    for group in groups {
        if group.selected && !group.name.is_empty() && !names.contains(&group.name) {
            names.push(group.name.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{fixture_external_claim, fixture_scope, fixture_selected_external_claim};
    use rstest::rstest;

    fn given_claims() -> Vec<SelectedExternalClaim> {
        vec![
            fixture_selected_external_claim(|c| {
                c.claim = fixture_external_claim(|_| {});
                c.requested = true;
            }),
            fixture_selected_external_claim(|c| {
                c.claim = fixture_external_claim(|e| {
                    e.claim_uri = "given_name".to_string();
                    e.mapped_local_claim_uri = "http://wso2.org/claims/givenname".to_string();
                    e.local_claim_display_name = Some("First Name".to_string());
                });
            }),
            fixture_selected_external_claim(|c| {
                c.claim = fixture_external_claim(|e| {
                    e.claim_uri = "upn".to_string();
                    e.mapped_local_claim_uri = "http://wso2.org/claims/userprincipal".to_string();
                });
            }),
        ]
    }

    fn given_scopes() -> Vec<OidcScope> {
        vec![
            fixture_scope(|s| {
                s.name = "profile".to_string();
                s.display_name = "Profile".to_string();
                s.description = None;
                s.claims = vec!["given_name".to_string()];
            }),
            fixture_scope(|_| {}),
            fixture_scope(|s| {
                s.name = "phone".to_string();
                s.display_name = "Phone".to_string();
                s.description = None;
                s.claims = vec!["phone_number".to_string()];
            }),
        ]
    }

    #[test]
    fn test_group_by_scopes() {
        // given
        let claims = given_claims();
        let scopes = given_scopes();

        // when
        let got = group_by_scopes(&claims, &scopes);

        // then
        let summary: Vec<_> = got
            .iter()
            .map(|g| (g.name.as_str(), g.claims.len(), g.selected))
            .collect();
        assert_eq!(summary, vec![("", 1, false), ("email", 1, true), ("profile", 1, false)]);
        assert_eq!(got[0].claims[0].claim.claim_uri, "upn");
    }

    #[rstest]
    #[case::empty_query("", vec!["", "email", "profile"], vec![])]
    #[case::scope_display_name("PROF", vec!["profile"], vec![])]
    #[case::scope_description("address", vec!["email"], vec![])]
    #[case::claim_display_name("first", vec!["profile"], vec!["profile"])]
    #[case::mapped_local_claim("userprincipal", vec![""], vec![""])]
    #[case::no_match("zzz", vec![], vec![])]
    fn test_filter_scope_groups(
        #[case] query: &str,
        #[case] want_groups: Vec<&str>,
        #[case] want_expanded: Vec<&str>,
    ) {
        // given
        let groups = group_by_scopes(&given_claims(), &given_scopes());

        // when
        let got = filter_scope_groups(&groups, query);

        // then
        let names: Vec<_> = got.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, want_groups);
        assert_eq!(got.expanded, want_expanded);
    }

    #[test]
    fn test_selected_scope_names() {
        // given
        let groups = group_by_scopes(&given_claims(), &given_scopes());

        // when
        let got = selected_scope_names(&groups);

        // then
        assert_eq!(got, vec!["openid".to_string(), "email".to_string()]);
    }
}
