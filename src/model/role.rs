#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Gestionnaire = 1,
    ResponsableService = 2,
    ResponsableDivision = 3,
    Rh = 4,
    Administrateur = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Gestionnaire),
            2 => Some(Role::ResponsableService),
            3 => Some(Role::ResponsableDivision),
            4 => Some(Role::Rh),
            5 => Some(Role::Administrateur),
            _ => None,
        }
    }

    pub fn as_id(&self) -> u8 {
        *self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_id_round_trips_every_role() {
        for role in [
            Role::Gestionnaire,
            Role::ResponsableService,
            Role::ResponsableDivision,
            Role::Rh,
            Role::Administrateur,
        ] {
            assert_eq!(Role::from_id(role.as_id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(6), None);
    }
}
