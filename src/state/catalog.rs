//! 实体目录
//!
//! 域、域版本、镜像与镜像版本的唯一存放处。所有变更方法遵循
//! 先校验后应用：校验失败时不留下任何半成品状态。
//! 并发控制与快照持久化由外层 [`VersionStore`](super::version_store::VersionStore) 负责。
//!
//! 绑定通过镜像的稳定内部 id 指向镜像，因此改名是单条记录更新，
//! 不需要向绑定传播

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::error::VersionError;
use crate::domain::image::{Image, ImageId, ImageRow, ImageVersion, ImageVersionRow};
use crate::domain::name;
use crate::domain::promotion::{self, FollowUp};
use crate::domain::version::{Domain, DomainVersion, DomainVersionRow, Environment, ImageBinding};

/// 目录统计信息（健康检查与状态接口用）
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CatalogStats {
    pub domains: usize,
    pub domain_versions: usize,
    pub images: usize,
    pub image_versions: usize,
    /// 最近一次变更时间
    pub last_modified: Option<DateTime<Utc>>,
}

/// 实体目录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    /// 按名称索引的域（BTreeMap 保证列表输出按域名稳定有序）
    domains: BTreeMap<String, Domain>,
    /// 按稳定 id 索引的镜像
    images: HashMap<ImageId, Image>,
}

impl Catalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self {
            domains: BTreeMap::new(),
            images: HashMap::new(),
        }
    }

    // ---- 域操作 ----

    /// 确保域存在，不存在则创建
    ///
    /// 创建镜像、调整镜像归属时隐式建域走这里。返回是否新建
    pub fn ensure_domain(&mut self, name: &str) -> Result<bool, VersionError> {
        if !name::is_valid(name) {
            return Err(VersionError::InvalidName(name.to_string()));
        }
        if self.domains.contains_key(name) {
            return Ok(false);
        }
        self.domains
            .insert(name.to_string(), Domain::new(name.to_string()));
        Ok(true)
    }

    /// 为域创建新版本，域不存在时一并创建
    ///
    /// 域的首个版本直接激活（没有可顶替的旧版本）；
    /// 后续版本以 `(dev, tested=false, active=false)` 起步
    pub fn create_domain_version(
        &mut self,
        name: &str,
        version: &str,
    ) -> Result<DomainVersionRow, VersionError> {
        if !name::is_valid(name) {
            return Err(VersionError::InvalidName(name.to_string()));
        }
        if !name::is_valid(version) {
            return Err(VersionError::InvalidName(version.to_string()));
        }

        let dom = self
            .domains
            .entry(name.to_string())
            .or_insert_with(|| Domain::new(name.to_string()));
        if dom.find_version(version).is_some() {
            return Err(VersionError::Conflict(format!(
                "domain version '{name}/{version}' already exists"
            )));
        }

        let first = dom.versions.is_empty();
        let dv = DomainVersion::new(version.to_string(), first);
        // 新版本尚无绑定，先出行再入列
        let row = Self::build_row(&self.images, name, &dv);
        dom.versions.push(dv);
        dom.touch();
        Ok(row)
    }

    /// 域改名
    ///
    /// 名下镜像的归属字段同步改写；绑定持稳定 id，不受影响
    pub fn rename_domain(&mut self, name: &str, new_name: &str) -> Result<(), VersionError> {
        if !name::is_valid(new_name) {
            return Err(VersionError::InvalidName(new_name.to_string()));
        }
        if !self.domains.contains_key(name) {
            return Err(VersionError::domain_not_found(name));
        }
        if self.domains.contains_key(new_name) {
            return Err(VersionError::Conflict(format!(
                "domain '{new_name}' already exists"
            )));
        }

        if let Some(mut dom) = self.domains.remove(name) {
            dom.name = new_name.to_string();
            dom.touch();
            self.domains.insert(new_name.to_string(), dom);
        }
        // 名下镜像的归属一并改写
        for image in self.images.values_mut() {
            if image.domain == name {
                image.domain = new_name.to_string();
                image.touch();
            }
        }
        Ok(())
    }

    /// 删除域，级联删除其所有版本与绑定
    ///
    /// 名下仍有镜像时拒绝
    pub fn delete_domain(&mut self, name: &str) -> Result<(), VersionError> {
        if !self.domains.contains_key(name) {
            return Err(VersionError::domain_not_found(name));
        }
        let owned = self.images.values().filter(|i| i.domain == name).count();
        if owned > 0 {
            return Err(VersionError::Conflict(format!(
                "domain '{name}' still owns {owned} image(s)"
            )));
        }
        self.domains.remove(name);
        Ok(())
    }

    /// 删除域版本，其绑定随之移除
    ///
    /// 被引用的镜像与镜像版本保持不变
    pub fn delete_domain_version(&mut self, name: &str, version: &str) -> Result<(), VersionError> {
        let dom = self
            .domains
            .get_mut(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        let idx = dom
            .version_index(version)
            .ok_or_else(|| VersionError::domain_version_not_found(name, version))?;
        dom.versions.remove(idx);
        dom.touch();
        Ok(())
    }

    /// 将域版本推进到目标环境
    ///
    /// 规则校验与单版本状态变更见 [`promotion::promote`]；推进成功后
    /// 同域同环境的其他活跃版本取消激活（每个环境至多一个活跃版本）。
    /// 返回更新后的行与编排层需要执行的后续动作
    pub fn promote_domain_version(
        &mut self,
        name: &str,
        version: &str,
        target: Environment,
    ) -> Result<(DomainVersionRow, FollowUp), VersionError> {
        let dom = self
            .domains
            .get_mut(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        let idx = dom
            .version_index(version)
            .ok_or_else(|| VersionError::domain_version_not_found(name, version))?;

        let follow_up = promotion::promote(name, &mut dom.versions[idx], target)?;

        // 同环境只保留一个活跃版本
        for (i, v) in dom.versions.iter_mut().enumerate() {
            if i != idx && v.deployed == target && v.active {
                v.active = false;
            }
        }
        dom.touch();

        let row = Self::build_row(&self.images, name, &dom.versions[idx]);
        Ok((row, follow_up))
    }

    /// 设置域版本的 tested 标记
    ///
    /// 置 true 前实时重算 allImagesTested，从不缓存——镜像版本的
    /// tested 在绑定之后仍可能独立变化
    pub fn set_domain_version_tested(
        &mut self,
        name: &str,
        version: &str,
        tested: bool,
    ) -> Result<DomainVersionRow, VersionError> {
        let dom = self
            .domains
            .get_mut(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        let idx = dom
            .version_index(version)
            .ok_or_else(|| VersionError::domain_version_not_found(name, version))?;

        let all_tested = Self::images_all_tested(&self.images, &dom.versions[idx]);
        promotion::set_tested(name, &mut dom.versions[idx], tested, all_tested)?;
        dom.touch();

        Ok(Self::build_row(&self.images, name, &dom.versions[idx]))
    }

    /// 激活域版本
    ///
    /// 同域同环境的其他活跃版本同时取消激活
    pub fn activate_domain_version(
        &mut self,
        name: &str,
        version: &str,
    ) -> Result<DomainVersionRow, VersionError> {
        let dom = self
            .domains
            .get_mut(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        let idx = dom
            .version_index(version)
            .ok_or_else(|| VersionError::domain_version_not_found(name, version))?;

        let env = dom.versions[idx].deployed;
        for (i, v) in dom.versions.iter_mut().enumerate() {
            if i == idx {
                v.active = true;
            } else if v.deployed == env && v.active {
                v.active = false;
            }
        }
        dom.touch();

        Ok(Self::build_row(&self.images, name, &dom.versions[idx]))
    }

    // ---- 绑定操作 ----

    /// 批量更新域版本的镜像绑定
    ///
    /// 两阶段：先把整批 (镜像名, 版本) 解析成稳定 id，任何一条无法解析
    /// 则整批拒绝、不应用任何绑定；再逐条插入或重指。同批内对同一镜像
    /// 的后写覆盖先写，每个镜像至多留一条绑定
    pub fn update_domain_version_images(
        &mut self,
        name: &str,
        version: &str,
        bindings: &[(String, String)],
    ) -> Result<DomainVersionRow, VersionError> {
        {
            let dom = self
                .domains
                .get(name)
                .ok_or_else(|| VersionError::domain_not_found(name))?;
            if dom.find_version(version).is_none() {
                return Err(VersionError::domain_version_not_found(name, version));
            }
        }

        // 解析阶段
        let mut resolved = Vec::with_capacity(bindings.len());
        for (image_name, image_version) in bindings {
            let image = self
                .images
                .values()
                .find(|i| i.name == *image_name)
                .ok_or_else(|| VersionError::UnknownImageVersion {
                    name: image_name.clone(),
                    version: image_version.clone(),
                })?;
            if image.find_version(image_version).is_none() {
                return Err(VersionError::UnknownImageVersion {
                    name: image_name.clone(),
                    version: image_version.clone(),
                });
            }
            resolved.push((image.id, image_version.clone()));
        }

        // 应用阶段
        let dom = self
            .domains
            .get_mut(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        let idx = dom
            .version_index(version)
            .ok_or_else(|| VersionError::domain_version_not_found(name, version))?;
        let dv = &mut dom.versions[idx];
        for (image_id, image_version) in resolved {
            match dv.binding_mut(image_id) {
                Some(binding) => binding.version = image_version,
                None => dv.images.push(ImageBinding {
                    image: image_id,
                    version: image_version,
                }),
            }
        }
        dom.touch();

        Ok(Self::build_row(&self.images, name, &dom.versions[idx]))
    }

    /// allImagesTested：零绑定时恒真，否则对所有被绑定镜像版本的 tested 取与
    fn images_all_tested(images: &HashMap<ImageId, Image>, dv: &DomainVersion) -> bool {
        dv.images.iter().all(|b| {
            images
                .get(&b.image)
                .and_then(|image| image.find_version(&b.version))
                .map_or(false, |v| v.tested)
        })
    }

    /// 绑定行：镜像显示名 + 绑定版本 + 该版本当前的 tested（现解现算）
    fn binding_rows(images: &HashMap<ImageId, Image>, dv: &DomainVersion) -> Vec<ImageVersionRow> {
        dv.images
            .iter()
            .filter_map(|b| {
                images.get(&b.image).map(|image| ImageVersionRow {
                    name: image.name.clone(),
                    version: b.version.clone(),
                    tested: image.find_version(&b.version).map_or(false, |v| v.tested),
                })
            })
            .collect()
    }

    fn build_row(
        images: &HashMap<ImageId, Image>,
        name: &str,
        dv: &DomainVersion,
    ) -> DomainVersionRow {
        DomainVersionRow {
            name: name.to_string(),
            version: dv.version.clone(),
            deployed: dv.deployed,
            tested: dv.tested,
            active: dv.active,
            images: Self::binding_rows(images, dv),
        }
    }

    // ---- 域读取 ----

    /// 所有域的全部版本，按域名与创建顺序展开成行
    pub fn list_domains(&self) -> Vec<DomainVersionRow> {
        self.domains
            .values()
            .flat_map(|dom| {
                dom.versions
                    .iter()
                    .map(|dv| Self::build_row(&self.images, &dom.name, dv))
            })
            .collect()
    }

    /// 所有活跃版本行，可按环境过滤
    pub fn list_active(&self, env: Option<Environment>) -> Vec<DomainVersionRow> {
        self.domains
            .values()
            .flat_map(|dom| {
                dom.versions
                    .iter()
                    .filter(|dv| dv.active && env.map_or(true, |e| dv.deployed == e))
                    .map(|dv| Self::build_row(&self.images, &dom.name, dv))
            })
            .collect()
    }

    /// 单个域的全部版本行
    pub fn get_domain_versions(&self, name: &str) -> Result<Vec<DomainVersionRow>, VersionError> {
        let dom = self
            .domains
            .get(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        Ok(dom
            .versions
            .iter()
            .map(|dv| Self::build_row(&self.images, name, dv))
            .collect())
    }

    /// 单个域的活跃版本行
    pub fn get_domain_active(&self, name: &str) -> Result<Vec<DomainVersionRow>, VersionError> {
        let dom = self
            .domains
            .get(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        Ok(dom
            .versions
            .iter()
            .filter(|dv| dv.active)
            .map(|dv| Self::build_row(&self.images, name, dv))
            .collect())
    }

    /// 单个域版本行
    pub fn get_domain_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<DomainVersionRow, VersionError> {
        let dom = self
            .domains
            .get(name)
            .ok_or_else(|| VersionError::domain_not_found(name))?;
        let dv = dom
            .find_version(version)
            .ok_or_else(|| VersionError::domain_version_not_found(name, version))?;
        Ok(Self::build_row(&self.images, name, dv))
    }

    // ---- 镜像操作 ----

    /// 创建镜像，归属域不存在时一并创建
    pub fn create_image(&mut self, name: &str, domain: &str) -> Result<ImageRow, VersionError> {
        if !name::is_valid(name) {
            return Err(VersionError::InvalidName(name.to_string()));
        }
        if self.images.values().any(|i| i.name == name) {
            return Err(VersionError::Conflict(format!(
                "image '{name}' already exists"
            )));
        }
        self.ensure_domain(domain)?;

        let image = Image::new(name.to_string(), domain.to_string());
        let row = ImageRow {
            name: image.name.clone(),
            domain: image.domain.clone(),
        };
        self.images.insert(image.id, image);
        Ok(row)
    }

    /// 镜像改名
    ///
    /// 版本历史与既有绑定不受影响（绑定持稳定 id）
    pub fn rename_image(&mut self, name: &str, new_name: &str) -> Result<(), VersionError> {
        if !name::is_valid(new_name) {
            return Err(VersionError::InvalidName(new_name.to_string()));
        }
        let id = self
            .image_id(name)
            .ok_or_else(|| VersionError::image_not_found(name))?;
        if self.images.values().any(|i| i.name == new_name) {
            return Err(VersionError::Conflict(format!(
                "image '{new_name}' already exists"
            )));
        }
        if let Some(image) = self.images.get_mut(&id) {
            image.name = new_name.to_string();
            image.touch();
        }
        Ok(())
    }

    /// 调整镜像归属域，目标域不存在时一并创建
    pub fn set_image_domain(&mut self, name: &str, domain: &str) -> Result<(), VersionError> {
        let id = self
            .image_id(name)
            .ok_or_else(|| VersionError::image_not_found(name))?;
        self.ensure_domain(domain)?;
        if let Some(image) = self.images.get_mut(&id) {
            image.domain = domain.to_string();
            image.touch();
        }
        Ok(())
    }

    /// 删除镜像，级联删除其全部版本
    ///
    /// 仍被任何域版本绑定时拒绝
    pub fn delete_image(&mut self, name: &str) -> Result<(), VersionError> {
        let id = self
            .image_id(name)
            .ok_or_else(|| VersionError::image_not_found(name))?;
        let bound = self
            .domains
            .values()
            .flat_map(|dom| dom.versions.iter())
            .filter(|dv| dv.binding(id).is_some())
            .count();
        if bound > 0 {
            return Err(VersionError::Conflict(format!(
                "image '{name}' is still bound by {bound} domain version(s)"
            )));
        }
        self.images.remove(&id);
        Ok(())
    }

    /// 创建镜像版本，初始未测试
    pub fn create_image_version(
        &mut self,
        name: &str,
        version: &str,
    ) -> Result<ImageVersionRow, VersionError> {
        if !name::is_valid(version) {
            return Err(VersionError::InvalidName(version.to_string()));
        }
        let image = self
            .images
            .values_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| VersionError::image_not_found(name))?;
        if image.find_version(version).is_some() {
            return Err(VersionError::Conflict(format!(
                "image version '{name}@{version}' already exists"
            )));
        }
        image.versions.push(ImageVersion::new(version.to_string()));
        image.touch();
        Ok(ImageVersionRow {
            name: name.to_string(),
            version: version.to_string(),
            tested: false,
        })
    }

    /// 新镜像版本出炉后，写入归属域当前活跃 dev 版本的绑定：
    /// 已绑定该镜像则重指到新版本，未绑定则新增一条绑定
    ///
    /// 归属域没有活跃 dev 版本时不做任何事。返回被更新的 (域, 域版本)
    pub fn bind_into_active_dev(
        &mut self,
        image_name: &str,
        version: &str,
    ) -> Option<(String, String)> {
        let (id, owner) = self
            .images
            .values()
            .find(|i| i.name == image_name)
            .map(|i| (i.id, i.domain.clone()))?;
        let dom = self.domains.get_mut(&owner)?;
        let dv = dom
            .versions
            .iter_mut()
            .find(|v| v.active && v.deployed == Environment::Dev)?;
        match dv.binding_mut(id) {
            Some(binding) => binding.version = version.to_string(),
            None => dv.images.push(ImageBinding {
                image: id,
                version: version.to_string(),
            }),
        }
        let dv_version = dv.version.clone();
        dom.touch();
        Some((owner, dv_version))
    }

    /// 设置镜像版本的 tested 标记
    pub fn set_image_version_tested(
        &mut self,
        name: &str,
        version: &str,
        tested: bool,
    ) -> Result<ImageVersionRow, VersionError> {
        let image = self
            .images
            .values_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| VersionError::image_not_found(name))?;
        let v = image
            .find_version_mut(version)
            .ok_or_else(|| VersionError::image_version_not_found(name, version))?;
        v.tested = tested;
        image.touch();
        Ok(ImageVersionRow {
            name: name.to_string(),
            version: version.to_string(),
            tested,
        })
    }

    // ---- 镜像读取 ----

    /// 镜像与归属域的映射，按镜像名排序
    pub fn list_images(&self) -> Vec<ImageRow> {
        let mut rows: Vec<ImageRow> = self
            .images
            .values()
            .map(|i| ImageRow {
                name: i.name.clone(),
                domain: i.domain.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// 全部镜像版本行，按镜像名排序、版本按创建顺序
    pub fn list_image_versions(&self) -> Vec<ImageVersionRow> {
        let mut images: Vec<&Image> = self.images.values().collect();
        images.sort_by(|a, b| a.name.cmp(&b.name));
        images
            .iter()
            .flat_map(|image| {
                image.versions.iter().map(|v| ImageVersionRow {
                    name: image.name.clone(),
                    version: v.version.clone(),
                    tested: v.tested,
                })
            })
            .collect()
    }

    /// 已测试的镜像版本行，可按归属域过滤
    pub fn list_tested_image_versions(&self, domain: Option<&str>) -> Vec<ImageVersionRow> {
        let mut images: Vec<&Image> = self
            .images
            .values()
            .filter(|i| domain.map_or(true, |d| i.domain == d))
            .collect();
        images.sort_by(|a, b| a.name.cmp(&b.name));
        images
            .iter()
            .flat_map(|image| {
                image.versions.iter().filter(|v| v.tested).map(|v| {
                    ImageVersionRow {
                        name: image.name.clone(),
                        version: v.version.clone(),
                        tested: v.tested,
                    }
                })
            })
            .collect()
    }

    /// 单个镜像中 tested 标记等于给定值的版本行
    pub fn get_image_versions_by_tested(
        &self,
        name: &str,
        tested: bool,
    ) -> Result<Vec<ImageVersionRow>, VersionError> {
        let image = self
            .images
            .values()
            .find(|i| i.name == name)
            .ok_or_else(|| VersionError::image_not_found(name))?;
        Ok(image
            .versions
            .iter()
            .filter(|v| v.tested == tested)
            .map(|v| ImageVersionRow {
                name: image.name.clone(),
                version: v.version.clone(),
                tested: v.tested,
            })
            .collect())
    }

    /// 单个镜像的版本行
    pub fn get_image_versions(&self, name: &str) -> Result<Vec<ImageVersionRow>, VersionError> {
        let image = self
            .images
            .values()
            .find(|i| i.name == name)
            .ok_or_else(|| VersionError::image_not_found(name))?;
        Ok(image
            .versions
            .iter()
            .map(|v| ImageVersionRow {
                name: image.name.clone(),
                version: v.version.clone(),
                tested: v.tested,
            })
            .collect())
    }

    /// 按显示名解析镜像 id
    fn image_id(&self, name: &str) -> Option<ImageId> {
        self.images.values().find(|i| i.name == name).map(|i| i.id)
    }

    /// 目录统计
    pub fn stats(&self) -> CatalogStats {
        let last_modified = self
            .domains
            .values()
            .map(|d| d.updated_at)
            .chain(self.images.values().map(|i| i.updated_at))
            .max();
        CatalogStats {
            domains: self.domains.len(),
            domain_versions: self.domains.values().map(|d| d.versions.len()).sum(),
            images: self.images.len(),
            image_versions: self.images.values().map(|i| i.versions.len()).sum(),
            last_modified,
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
