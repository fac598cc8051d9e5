//! 数据源完整性检查，只读

use std::sync::Arc;

use async_trait::async_trait;
use syncer_core::{ContactMedium, SourceDirectory, SyncResult};
use syncer_dispatcher::{JobContext, Runnable};
use syncer_domain::{contains_whitespace, has_surrounding_whitespace, is_valid_email};
use tracing::{debug, info};

use crate::INTEGRITY_CHECK;

pub struct IntegrityJob {
    source: Arc<dyn SourceDirectory>,
}

impl IntegrityJob {
    pub fn new(source: Arc<dyn SourceDirectory>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Runnable for IntegrityJob {
    fn task_type(&self) -> &str {
        INTEGRITY_CHECK
    }

    async fn run(&self, ctx: &mut JobContext) -> SyncResult<()> {
        let persons = self.source.list_persons().await?;
        let mut checked = 0;

        for person in &persons {
            let (Some(first_name), Some(last_name)) = (&person.first_name, &person.last_name)
            else {
                debug!("人员 {} 没有姓名，跳过检查", person.id);
                continue;
            };
            checked += 1;
            let label = format!("(ID: {}, 姓名: {first_name} {last_name})", person.id);

            if has_surrounding_whitespace(first_name) {
                ctx.record_deviation(format!("'firstName' 首尾含空白 {label}"));
            }
            if has_surrounding_whitespace(last_name) {
                ctx.record_deviation(format!("'lastName' 首尾含空白 {label}"));
            }

            let infos = self.source.list_contact_info_by_person(person.id).await?;
            for info in infos.iter().filter(|info| info.medium == ContactMedium::Email) {
                if contains_whitespace(&info.content) {
                    ctx.record_deviation(format!("'email' 含空白 '{}' {label}", info.content));
                }
                if !is_valid_email(info.content.trim()) {
                    ctx.record_deviation(format!("'email' 格式不匹配 '{}' {label}", info.content));
                }
            }
        }

        info!("完整性检查完成: 检查 {} / {} 名人员", checked, persons.len());
        Ok(())
    }
}
