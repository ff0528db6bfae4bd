//! Full plan runs against fake tools.

use cibuild_lib::manifest::PlanOptions;
use cibuild_lib::{BuildError, PrefixRole};

use super::common::{FakeMirror, FakeTools, Workspace, run_plan};

#[tokio::test]
async fn full_plan_installs_every_package_into_its_prefix() {
  let ws = Workspace::new();
  let plan = ws.manifest.plan(PlanOptions::default());
  let mut builder = ws.builder(FakeTools::new(), FakeMirror::for_manifest(&ws.manifest));

  run_plan(&mut builder, &plan).await.unwrap();

  assert!(ws.is_installed("nasm", PrefixRole::HostTool));
  assert!(!ws.is_installed("nasm", PrefixRole::Target));
  for name in ["lame", "openjpeg", "dav1d", "x265", "ffmpeg"] {
    assert!(ws.is_installed(name, PrefixRole::Target), "{} not installed", name);
  }

  // 5 single-pass packages with 3 steps each, x265 with 3 cmake passes
  assert_eq!(builder.runner().invocations().len(), 5 * 3 + 9);
}

#[tokio::test]
async fn final_artifact_is_configured_with_collected_flags() {
  let ws = Workspace::new();
  let plan = ws.manifest.plan(PlanOptions::default());
  let mut builder = ws.builder(FakeTools::new(), FakeMirror::for_manifest(&ws.manifest));

  run_plan(&mut builder, &plan).await.unwrap();

  let calls = builder.runner().invocations();
  let configure = calls
    .iter()
    .rev()
    .find(|call| call.program == "sh")
    .expect("ffmpeg configure");
  let args = configure.args.join(" ");
  assert!(args.ends_with("--disable-doc --enable-gpl --enable-libmp3lame --enable-libopenjpeg --enable-libdav1d --enable-libx265"));
  assert!(configure.cwd.as_ref().unwrap().ends_with("build/ffmpeg/build"));
}

#[tokio::test]
async fn host_tool_bin_dir_leads_path_of_every_invocation() {
  let ws = Workspace::new();
  let plan = ws.manifest.plan(PlanOptions::default());
  let mut builder = ws.builder(FakeTools::new(), FakeMirror::for_manifest(&ws.manifest));

  run_plan(&mut builder, &plan).await.unwrap();

  let expected = format!("{}:/usr/bin", ws.host_dest().join("bin").display());
  for call in builder.runner().invocations() {
    assert_eq!(call.env.get("PATH"), Some(expected.as_str()), "{}", call);
  }
  assert!(std::env::var("PATH").unwrap_or_default() != expected);
}

#[tokio::test]
async fn second_run_does_nothing() {
  let ws = Workspace::new();
  let plan = ws.manifest.plan(PlanOptions::default());
  let mirror = FakeMirror::for_manifest(&ws.manifest);
  let mut first = ws.builder(FakeTools::new(), &mirror);
  run_plan(&mut first, &plan).await.unwrap();
  let fetched = mirror.fetched().len();

  let mut second = ws.builder(FakeTools::new(), &mirror);
  run_plan(&mut second, &plan).await.unwrap();

  assert!(second.runner().invocations().is_empty());
  assert_eq!(mirror.fetched().len(), fetched);
}

#[tokio::test]
async fn failed_run_resumes_where_it_stopped() {
  let ws = Workspace::new();
  let plan = ws.manifest.plan(PlanOptions::default());

  let mut failing = ws.builder(FakeTools::failing_on("meson setup"), FakeMirror::for_manifest(&ws.manifest));
  let result = run_plan(&mut failing, &plan).await;
  assert!(matches!(result, Err(BuildError::CmdFailed { .. })));
  assert!(ws.is_installed("openjpeg", PrefixRole::Target));
  assert!(!ws.is_installed("dav1d", PrefixRole::Target));

  let mut retry = ws.builder(FakeTools::new(), FakeMirror::for_manifest(&ws.manifest));
  run_plan(&mut retry, &plan).await.unwrap();

  let programs = retry.runner().programs();
  assert_eq!(&programs[..3], &["meson", "ninja", "ninja"]);
  assert!(ws.is_installed("ffmpeg", PrefixRole::Target));
}

#[tokio::test]
async fn downloads_are_cached_across_runs() {
  let ws = Workspace::new();
  let plan = ws.manifest.plan(PlanOptions::default());
  let mirror = FakeMirror::for_manifest(&ws.manifest);

  let mut failing = ws.builder(FakeTools::failing_on("nasm"), &mirror);
  assert!(run_plan(&mut failing, &plan).await.is_err());
  let fetched = mirror.fetched().len();
  assert_eq!(fetched, plan.len());

  let mut retry = ws.builder(FakeTools::new(), &mirror);
  run_plan(&mut retry, &plan).await.unwrap();
  assert_eq!(mirror.fetched().len(), fetched);
}

#[tokio::test]
async fn patches_are_applied_after_extraction() {
  let ws = Workspace::new();
  ws.write_patch("lame");
  let plan = ws.manifest.plan(PlanOptions::default());
  let mut builder = ws.builder(FakeTools::new(), FakeMirror::for_manifest(&ws.manifest));

  run_plan(&mut builder, &plan).await.unwrap();

  let calls = builder.runner().invocations();
  assert_eq!(calls[0].program, "patch");
  assert!(calls[0].args.contains(&"-p1".to_string()));
  assert!(calls[0].command_line().contains("build/lame"));
}

#[tokio::test]
async fn lgpl_plan_skips_gpl_packages() {
  let ws = Workspace::new();
  let plan = ws.manifest.plan(PlanOptions {
    disable_gpl: true,
    ..Default::default()
  });
  let mut builder = ws.builder(FakeTools::new(), FakeMirror::for_manifest(&ws.manifest));

  run_plan(&mut builder, &plan).await.unwrap();

  assert!(!ws.is_installed("x265", PrefixRole::Target));
  assert!(!ws.root().join("build/x265").exists());
  let ffmpeg = plan.artifact().unwrap();
  assert!(ffmpeg.build_arguments.contains(&"--disable-libx265".to_string()));
}
