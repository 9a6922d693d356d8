//! SeaORM Entity for tags table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::video_tags::Entity")]
    VideoTags,
}

impl Related<super::video_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VideoTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
