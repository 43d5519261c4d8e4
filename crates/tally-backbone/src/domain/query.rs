use std::str::FromStr;

use sea_orm::{
    sea_query::{Alias, Expr},
    EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect, Select,
};

/// Filtering, ordering, pagination and embedding requested by a list call.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ListQuery {
    filters: Vec<(String, String)>,
    sort: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
    embeds: Vec<String>,
}

/// One page of a listing plus the number of rows matching the filters.
#[derive(Debug, PartialEq)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { items: self.items.into_iter().map(f).collect(), count: self.count }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum QueryError {
    #[error("where clause `{0}` is not of the form field:value")]
    MalformedFilter(String),
    #[error("sort clause `{0}` is invalid")]
    MalformedSort(String),
    #[error("field `{0}` cannot be queried")]
    UnknownField(String),
    #[error("`{0}` cannot be embedded")]
    UnknownEmbed(String),
    #[error("{0} `{1}` is out of range")]
    OutOfRange(&'static str, u64),
}

const MAX_WINDOW: u64 = i64::MAX as u64;

impl ListQuery {
    pub fn parse(
        where_clause: Option<&str>,
        sort: Option<&str>,
        limit: Option<u64>,
        offset: Option<u64>,
        embed: Option<&str>,
    ) -> Result<Self, QueryError> {
        for (name, value) in [("limit", limit), ("offset", offset)] {
            if let Some(value) = value.filter(|value| *value > MAX_WINDOW) {
                return Err(QueryError::OutOfRange(name, value));
            }
        }

        let filters = split_list(where_clause)
            .map(|clause| match clause.split_once(':') {
                Some((field, value)) if !field.trim().is_empty() => Ok((field.trim().to_owned(), value.to_owned())),
                _ => Err(QueryError::MalformedFilter(clause.to_owned())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sort = split_list(sort)
            .map(|clause| {
                let (field, order) = match clause.strip_prefix('-') {
                    Some(field) => (field, Order::Desc),
                    None => (clause, Order::Asc),
                };
                if field.is_empty() || field.starts_with('-') {
                    return Err(QueryError::MalformedSort(clause.to_owned()));
                }
                Ok((field.to_owned(), order))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let embeds = split_list(embed).map(str::to_owned).collect();

        Ok(Self { filters, sort, limit, offset, embeds })
    }

    pub fn embeds(&self, relation: &str) -> bool {
        self.embeds.iter().any(|embed| embed == relation)
    }

    pub fn ensure_embeds(&self, allowed: &[&str]) -> Result<(), QueryError> {
        match self.embeds.iter().find(|embed| !allowed.contains(&embed.as_str())) {
            Some(embed) => Err(QueryError::UnknownEmbed(embed.to_owned())),
            None => Ok(()),
        }
    }

    /// Narrows and orders `select`; `hidden` names columns that may never be queried.
    pub fn apply<E>(&self, mut select: Select<E>, hidden: &[&str]) -> Result<Select<E>, QueryError>
    where
        E: EntityTrait,
    {
        for (field, value) in &self.filters {
            let column = column::<E>(field, hidden)?;
            select = select
                .filter(Expr::expr(Expr::col((E::default(), column)).cast_as(Alias::new("text"))).eq(value.as_str()));
        }

        if self.sort.is_empty() {
            if let Ok(created_at) = E::Column::from_str("created_at") {
                select = select.order_by(created_at, Order::Asc);
            }
        }
        for (field, order) in &self.sort {
            select = select.order_by(column::<E>(field, hidden)?, order.clone());
        }

        Ok(select)
    }

    pub fn paginate<E>(&self, select: Select<E>) -> Select<E>
    where
        E: EntityTrait,
    {
        select.limit(self.limit).offset(self.offset)
    }
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value.unwrap_or_default().split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn column<E: EntityTrait>(field: &str, hidden: &[&str]) -> Result<E::Column, QueryError> {
    if hidden.contains(&field) {
        return Err(QueryError::UnknownField(field.to_owned()));
    }

    E::Column::from_str(field).map_err(|_| QueryError::UnknownField(field.to_owned()))
}
