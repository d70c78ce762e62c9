//! ContainerSpec から Docker API パラメータへの変換

use bollard::container::{Config, CreateContainerOptions};
use bollard::models::{HealthConfig, HostConfig, Mount, MountTypeEnum};
use podflow_core::ContainerSpec;
use std::collections::HashMap;

/// ContainerSpecをDockerのコンテナ設定に変換
pub fn spec_to_container_config(
    spec: &ContainerSpec,
) -> (Config<String>, CreateContainerOptions<String>) {
    // 環境変数の設定
    let env: Vec<String> = spec
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    // bind マウント（"host:dest:mode" 形式）
    let binds: Vec<String> = spec
        .bind_mounts
        .iter()
        .map(|m| {
            let mode = if m.read_only { "ro" } else { "rw" };
            format!("{}:{}:{}", m.source.display(), m.destination, mode)
        })
        .collect();

    // 名前付きボリュームのマウント
    let mounts: Vec<Mount> = spec
        .named_volumes
        .iter()
        .map(|v| Mount {
            target: Some(v.destination.clone()),
            source: Some(v.name.clone()),
            typ: Some(MountTypeEnum::VOLUME),
            read_only: Some(v.options.iter().any(|o| o == "ro")),
            ..Default::default()
        })
        .collect();

    // リソース制限
    let limits = spec.resource_limits.unwrap_or_default();

    // pod 所属コンテナは infra コンテナの名前空間へ参加する
    let namespace_mode = spec.pod.as_ref().map(|pod| format!("container:{}", pod));

    let host_config = Some(HostConfig {
        binds: (!binds.is_empty()).then_some(binds),
        mounts: (!mounts.is_empty()).then_some(mounts),
        cpu_quota: limits.cpu_quota,
        cpu_period: limits.cpu_period.map(|p| p as i64),
        cpu_shares: limits.cpu_shares.map(|s| s as i64),
        memory: limits.memory_limit,
        oom_score_adj: limits.oom_score_adj.map(i64::from),
        network_mode: namespace_mode.clone(),
        ipc_mode: namespace_mode,
        ..Default::default()
    });

    // ラベル設定
    let mut labels: HashMap<String, String> = spec.labels.clone();
    labels.insert("podflow.container".to_string(), spec.name.clone());
    if let Some(pod) = &spec.pod {
        labels.insert("podflow.pod".to_string(), pod.clone());
    }

    // ヘルスチェック設定（期間はナノ秒、ゼロは無効化）
    let healthcheck = spec.health_check.as_ref().map(|hc| HealthConfig {
        test: Some(hc.test.clone()),
        interval: Some(hc.interval.as_nanos() as i64),
        timeout: Some(hc.timeout.as_nanos() as i64),
        retries: Some(i64::from(hc.retries)),
        start_period: Some(hc.start_period.as_nanos() as i64),
        ..Default::default()
    });

    let config = Config {
        image: Some(spec.image.clone()),
        cmd: (!spec.command.is_empty()).then(|| spec.command.clone()),
        env: (!env.is_empty()).then_some(env),
        tty: Some(spec.terminal),
        working_dir: spec.workdir.clone(),
        labels: Some(labels),
        healthcheck,
        host_config,
        ..Default::default()
    };

    let options = CreateContainerOptions {
        name: spec.name.clone(),
        platform: None,
    };

    (config, options)
}
