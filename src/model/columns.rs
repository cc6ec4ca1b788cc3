// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Binding of external column metadata to a registered type.
//!
//! Row-oriented streams carry fields positionally: the first column is
//! field 1, the second field 2, and so on. Binding matches each column
//! label to a declared member (by alias or name, case-insensitively) and
//! produces a new type whose plan dispatches on column positions while
//! filling the original member slots.

use crate::error::Error;
use crate::model::field_plan::{MemberPlan, TypePlan};
use crate::model::type_model::{TypeEntry, TypeModel};
use crate::types::TypeKey;

/// One column of external metadata, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>) -> ColumnSpec {
        ColumnSpec { name: name.into() }
    }
}

impl TypeModel {
    /// Derives a positionally numbered variant of `base` from column
    /// metadata. A column with no matching member fails with
    /// [`Error::UnmappableColumn`].
    pub fn bind_columns(
        &mut self,
        base: TypeKey,
        columns: &[ColumnSpec],
    ) -> Result<TypeKey, Error> {
        let plan = self.plan(base)?;
        let mut members = Vec::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            let member = plan
                .members
                .iter()
                .find(|m| m.matches_label(&column.name))
                .ok_or_else(|| Error::UnmappableColumn {
                    column: column.name.clone(),
                })?;
            let mut codec = member.codec.clone();
            codec.field_number = (position + 1) as u32;
            members.push(MemberPlan {
                name: member.name.clone(),
                alias: member.alias.clone(),
                codec,
            });
        }
        let bound = TypePlan {
            members,
            defaults: plan.defaults.clone(),
            construct: plan.construct.clone(),
            subtypes: Vec::new(),
            before: plan.before.clone(),
            after: plan.after.clone(),
        };
        let base_name = self.name(base).unwrap_or("?").to_string();
        let name = format!("{}@cols{}", base_name, self.entries.len());
        let key = TypeKey(self.entries.len() as u32);
        log::debug!("bound {} columns of `{}` as `{}`", columns.len(), base_name, name);
        self.by_name.insert(name.clone(), key);
        self.entries.push(TypeEntry { name, plan: bound });
        Ok(key)
    }
}
