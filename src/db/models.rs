use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: String,
}

impl User {
    /// User id left-padded with zeros to six digits, as shown on profile screens.
    pub fn number_id(&self) -> String {
        format!("{:06}", self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    pub id: i64,
    pub name: Option<String>,
    pub straps_num: i64,
    pub board_id: i64,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub is_private: bool,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub label: String,
    pub image_path: String,
    pub category_id: i64,
    pub public: bool,
    pub creator_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePosition {
    pub id: i64,
    pub image_id: i64,
    pub position_x: String,
    pub position_y: String,
    pub tab_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedProfile {
    pub user_id: i64,
    pub username: String,
    pub number_id: String,
    pub profile_pic: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_id_is_zero_padded() {
        let user = User {
            id: 42,
            username: "cg1".into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
            is_staff: false,
            date_joined: String::new(),
        };
        assert_eq!(user.number_id(), "000042");
    }
}
