use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};
use uuid::Uuid;

/// User id column: a UUID stored as hyphenated TEXT
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DUuid(Uuid);

impl DUuid {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DUuid> for Uuid {
    fn from(val: DUuid) -> Self {
        val.0
    }
}

impl From<Uuid> for DUuid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Decode<'_, Sqlite> for DUuid {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let text = <&str as Decode<Sqlite>>::decode(value)?;
        Ok(Self(Uuid::parse_str(text)?))
    }
}

impl Encode<'_, Sqlite> for DUuid {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Text(
            self.0.hyphenated().to_string().into(),
        ));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for DUuid {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}

impl std::fmt::Display for DUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
