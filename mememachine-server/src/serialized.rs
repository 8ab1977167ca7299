//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use mememachine_admin::{
    InvitationData, PlayCount as AdminPlayCount, SoundPage, StatisticsOverview, UserData,
    UsersOverview,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: String,
    email: String,
    role: String,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    id: String,
    email: String,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsersPage {
    current_user: User,
    users: Vec<User>,
    invitations: Vec<Invitation>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SoundsPage {
    user: User,
    is_admin: bool,
    files: Vec<String>,
    page: usize,
    num_of_sounds: usize,
    page_count: usize,
    on_first_page: bool,
    on_last_page: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayCount {
    sound_name: String,
    plays: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatisticsPage {
    all: Vec<PlayCount>,
    random: Vec<PlayCount>,
    dedicated: Vec<PlayCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginPage {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterPage {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Success {
    success: bool,
}

impl Success {
    pub fn new() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Uploaded {
    success: bool,
    files: Vec<String>,
}

impl Uploaded {
    pub fn new(files: Vec<String>) -> Self {
        Self {
            success: true,
            files,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    status: String,
}

impl Health {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role.as_str().to_string(),
            created_at: self.created_at.to_string(),
        }
    }
}

impl ToSerialized<Invitation> for InvitationData {
    fn to_serialized(&self) -> Invitation {
        Invitation {
            id: self.id.clone(),
            email: self.email.clone(),
            created_at: self.created_at.to_string(),
        }
    }
}

impl ToSerialized<PlayCount> for AdminPlayCount {
    fn to_serialized(&self) -> PlayCount {
        PlayCount {
            sound_name: self.sound_name.clone(),
            plays: self.plays,
        }
    }
}

impl ToSerialized<StatisticsPage> for StatisticsOverview {
    fn to_serialized(&self) -> StatisticsPage {
        StatisticsPage {
            all: self.all.to_serialized(),
            random: self.random.to_serialized(),
            dedicated: self.dedicated.to_serialized(),
        }
    }
}

impl UsersPage {
    pub fn new(current_user: &UserData, overview: &UsersOverview) -> Self {
        Self {
            current_user: current_user.to_serialized(),
            users: overview.users.to_serialized(),
            invitations: overview.invitations.to_serialized(),
        }
    }
}

impl SoundsPage {
    pub fn new(user: &UserData, is_admin: bool, page: SoundPage) -> Self {
        Self {
            user: user.to_serialized(),
            is_admin,
            files: page.files,
            page: page.page,
            num_of_sounds: page.total,
            page_count: page.page_count,
            on_first_page: page.first_page,
            on_last_page: page.last_page,
        }
    }
}
