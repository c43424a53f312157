mod merge_output;
mod plan_apply;
mod resolve_fix;
mod resolve_list_mark;
