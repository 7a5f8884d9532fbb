mod user_detail;
mod user_list;

pub use user_detail::{Origin, UserDetailView};
pub use user_list::UserListView;
