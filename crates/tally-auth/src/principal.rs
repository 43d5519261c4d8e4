use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SUPER_ADMIN_LABEL: &str = "SUPER_ADMIN";
pub const PRODUCT_OWNER_LABEL: &str = "PRODUCT_OWNER";
pub const ADMIN_LABEL: &str = "ADMIN";
pub const USER_LABEL: &str = "USER";
pub const REMOTECI_LABEL: &str = "REMOTECI";
pub const FEEDER_LABEL: &str = "FEEDER";

/// The authenticated caller of a request.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub role_id: Uuid,
    pub role: RoleLabel,
    pub team_id: Uuid,
    /// Teams the principal acts for: its own team, plus child teams for product owners.
    pub teams: Vec<Uuid>,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.role == RoleLabel::SuperAdmin
    }

    pub fn has_role(&self, roles: &[RoleLabel]) -> bool {
        roles.contains(&self.role)
    }

    pub fn is_in_team(&self, team_id: &Uuid) -> bool {
        self.is_super_admin() || self.teams.contains(team_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum RoleLabel {
    SuperAdmin,
    ProductOwner,
    Admin,
    User,
    RemoteCi,
    Feeder,
    Custom(String),
}

impl RoleLabel {
    pub const BUILTIN: [RoleLabel; 6] = [
        RoleLabel::SuperAdmin,
        RoleLabel::ProductOwner,
        RoleLabel::Admin,
        RoleLabel::User,
        RoleLabel::RemoteCi,
        RoleLabel::Feeder,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            RoleLabel::SuperAdmin => SUPER_ADMIN_LABEL,
            RoleLabel::ProductOwner => PRODUCT_OWNER_LABEL,
            RoleLabel::Admin => ADMIN_LABEL,
            RoleLabel::User => USER_LABEL,
            RoleLabel::RemoteCi => REMOTECI_LABEL,
            RoleLabel::Feeder => FEEDER_LABEL,
            RoleLabel::Custom(label) => label,
        }
    }
}

impl From<&str> for RoleLabel {
    fn from(s: &str) -> Self {
        match s {
            SUPER_ADMIN_LABEL => RoleLabel::SuperAdmin,
            PRODUCT_OWNER_LABEL => RoleLabel::ProductOwner,
            ADMIN_LABEL => RoleLabel::Admin,
            USER_LABEL => RoleLabel::User,
            REMOTECI_LABEL => RoleLabel::RemoteCi,
            FEEDER_LABEL => RoleLabel::Feeder,
            other => RoleLabel::Custom(other.to_owned()),
        }
    }
}

impl From<String> for RoleLabel {
    fn from(s: String) -> Self {
        RoleLabel::from(s.as_str())
    }
}

impl From<RoleLabel> for String {
    fn from(label: RoleLabel) -> Self {
        match label {
            RoleLabel::Custom(label) => label,
            builtin => builtin.as_str().to_owned(),
        }
    }
}

impl fmt::Display for RoleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use uuid::Uuid;

    use super::{Principal, RoleLabel};

    fn principal(role: RoleLabel, teams: Vec<Uuid>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "someone".to_owned(),
            role_id: Uuid::new_v4(),
            role,
            team_id: teams.first().copied().unwrap_or_else(Uuid::new_v4),
            teams,
        }
    }

    #[test]
    fn when_principal_is_super_admin_then_every_team_is_accessible() {
        let principal = principal(RoleLabel::SuperAdmin, vec![Uuid::new_v4()]);

        assert!(principal.is_in_team(&Uuid::new_v4()));
    }

    #[test]
    fn when_principal_is_not_super_admin_then_only_own_teams_are_accessible() {
        let own_team = Uuid::new_v4();
        let child_team = Uuid::new_v4();
        let principal = principal(RoleLabel::ProductOwner, vec![own_team, child_team]);

        assert!(principal.is_in_team(&own_team));
        assert!(principal.is_in_team(&child_team));
        assert!(!principal.is_in_team(&Uuid::new_v4()));
    }

    #[test]
    fn when_checking_roles_then_only_listed_labels_pass() {
        let principal = principal(RoleLabel::Admin, vec![]);

        assert!(principal.has_role(&[RoleLabel::SuperAdmin, RoleLabel::Admin]));
        assert!(!principal.has_role(&[RoleLabel::SuperAdmin, RoleLabel::ProductOwner]));
    }

    #[test]
    fn when_parsing_labels_then_unknown_labels_become_custom() {
        assert_eq!(RoleLabel::from("REMOTECI"), RoleLabel::RemoteCi);
        assert_eq!(RoleLabel::from("MANAGER"), RoleLabel::Custom("MANAGER".to_owned()));
        assert_eq!(String::from(RoleLabel::Custom("MANAGER".to_owned())), "MANAGER");
        assert_eq!(RoleLabel::ProductOwner.to_string(), "PRODUCT_OWNER");
    }

    #[test]
    fn when_serializing_label_then_it_is_a_plain_string() {
        let json = serde_json::to_string(&RoleLabel::SuperAdmin).unwrap();

        assert_eq!(json, "\"SUPER_ADMIN\"");
        assert_eq!(serde_json::from_str::<RoleLabel>("\"FEEDER\"").unwrap(), RoleLabel::Feeder);
    }
}
