use crate::{jwt::SessionData, schema::UserRole};

const USER_ACTIONS: &[ActionType] = &[
    ActionType::CreateRecipes,
    ActionType::ManageOwnRecipes,
    ActionType::ManageOwnProfile,
    ActionType::ManageOwnCart,
    ActionType::ManageOwnFavorites,
    ActionType::ManageOwnSubscriptions,
];

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (UserRole::User, USER_ACTIONS),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnProfile,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
            ActionType::ManageIngredients,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnProfile,
    ManageOwnCart,
    ManageOwnFavorites,
    ManageOwnSubscriptions,

    ManageUsers,
    ManageAllRecipes,
    ManageIngredients,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let user_uid = &session.user_uid;

        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if user_uid != uid {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: i32, user_uid: UserRole) -> SessionData {
        SessionData {
            user_id,
            username: String::from("someone"),
            is_admin: user_uid == UserRole::Admin,
            user_uid,
        }
    }

    #[test]
    fn users_manage_only_their_own_things() {
        let user = session(1, UserRole::User);

        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(ActionType::ManageOwnCart.authenticate(&user));
        assert!(!ActionType::ManageAllRecipes.authenticate(&user));
        assert!(!ActionType::ManageUsers.authenticate(&user));
    }

    #[test]
    fn admins_manage_everything() {
        let admin = session(1, UserRole::Admin);

        assert!(ActionType::ManageAllRecipes.authenticate(&admin));
        assert!(ActionType::ManageUsers.authenticate(&admin));
        assert!(ActionType::ManageIngredients.authenticate(&admin));
        assert!(admin.authenticate(ActionType::ManageOwnFavorites).is_ok());
    }

    #[test]
    fn ownership_decides_between_own_and_all() {
        let user = session(1, UserRole::User);
        let admin = session(2, UserRole::Admin);

        assert!(user.can_manage(ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes, 1));
        assert!(!user.can_manage(ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes, 5));
        assert!(admin.can_manage(ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes, 5));
    }

    #[test]
    fn every_role_manages_its_own_subscriptions() {
        for role in [UserRole::User, UserRole::Admin] {
            assert!(session(1, role)
                .authenticate(ActionType::ManageOwnSubscriptions)
                .is_ok());
        }
    }

    #[test]
    fn unauthorized_action_is_an_error() {
        assert!(session(1, UserRole::User)
            .authenticate(ActionType::ManageUsers)
            .is_err());
    }
}
